//! Integration tests for RingBuffer

use std::collections::VecDeque;

use fifos::{BufferError, RingBuffer};

/// Small deterministic generator so failures are reproducible
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        self.0 >> 33
    }

    fn below(&mut self, bound: usize) -> usize {
        usize::try_from(self.next()).unwrap() % bound
    }
}

#[test]
fn test_mixed_operations_preserve_fifo_order() {
    const CAPACITY: usize = 13;
    let mut ring = RingBuffer::with_capacity(CAPACITY).unwrap();
    let mut model: VecDeque<u8> = VecDeque::new();
    let mut rng = Lcg(7);
    let mut next_byte = 0u8;

    for _ in 0..5_000 {
        if rng.below(2) == 0 {
            let n = rng.below(CAPACITY + 1);
            let items: Vec<u8> = (0..n)
                .map(|_| {
                    next_byte = next_byte.wrapping_add(1);
                    next_byte
                })
                .collect();
            let result = ring.insert(&items);
            if n <= CAPACITY - model.len() {
                assert_eq!(result, Ok(()));
                model.extend(&items);
            } else {
                assert!(matches!(result, Err(BufferError::Overflow { .. })));
                next_byte = next_byte.wrapping_sub(u8::try_from(n).unwrap());
            }
        } else {
            let n = rng.below(CAPACITY + 1);
            let mut out = vec![0u8; n];
            let result = ring.remove(&mut out);
            if n <= model.len() {
                assert_eq!(result, Ok(()));
                let expected: Vec<u8> = model.drain(..n).collect();
                assert_eq!(out, expected);
            } else {
                assert!(matches!(result, Err(BufferError::Underflow { .. })));
            }
        }

        assert_eq!(ring.len(), model.len());
        assert!(ring.len() <= ring.capacity());
        assert_eq!(ring.free_space(), CAPACITY - model.len());
        assert_eq!(ring.is_empty(), model.is_empty());
    }
}

#[test]
fn test_error_display() {
    let e = BufferError::Overflow {
        requested: 5,
        free: 2,
    };
    assert_eq!(e.to_string(), "Buffer overflow: 5 bytes requested, 2 free");
}
