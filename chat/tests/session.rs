use std::thread;

use chat::{
    read_greeting, receive_messages, run_echo_peer, send_session, write_message, ChatError,
    Message, MessageKind, FROM_PEER, TO_PEER,
};
use fifos::{FifoConfig, FifoRegistry, Role};

fn registry() -> FifoRegistry<&'static str> {
    let _ = env_logger::builder().is_test(true).try_init();
    FifoRegistry::with_config(FifoConfig::default().with_capacity(512))
}

#[test]
fn test_chat_with_echo_peer() {
    let registry = registry();

    let peer = {
        let registry = registry.clone();
        thread::spawn(move || run_echo_peer(&registry, "echo", TO_PEER, FROM_PEER))
    };

    let receiver = {
        let registry = registry.clone();
        thread::spawn(move || -> Result<(String, Vec<String>), ChatError> {
            let mut input = registry.open(FROM_PEER, Role::Consumer)?;
            let peer = read_greeting(&mut input)?;
            let mut lines = Vec::new();
            receive_messages(&mut input, |text| lines.push(text.to_string()))?;
            Ok((peer, lines))
        })
    };

    let lines = vec!["hello".to_string(), "how are you?".to_string()];
    let mut output = registry.open(TO_PEER, Role::Producer).unwrap();
    assert_eq!(send_session(&mut output, "alice", lines.clone()), Ok(2));
    drop(output);

    let (peer_name, echoed) = receiver.join().unwrap().unwrap();
    assert_eq!(peer_name, "echo");
    assert_eq!(echoed, lines);
    assert_eq!(peer.join().unwrap(), Ok(2));

    // Both sessions are over and every endpoint is gone
    assert_eq!(registry.channel_count(), 0);
}

#[test]
fn test_session_must_start_with_name() {
    let registry = registry();

    let reader = {
        let registry = registry.clone();
        thread::spawn(move || {
            let mut input = registry.open("rude", Role::Consumer).unwrap();
            read_greeting(&mut input)
        })
    };

    let mut output = registry.open("rude", Role::Producer).unwrap();
    write_message(&mut output, &Message::normal("no introduction")).unwrap();

    assert_eq!(
        reader.join().unwrap(),
        Err(ChatError::Protocol {
            expected: MessageKind::Name,
            got: MessageKind::Normal,
        })
    );
}

#[test]
fn test_closed_stream_before_greeting() {
    let registry = registry();

    let reader = {
        let registry = registry.clone();
        thread::spawn(move || {
            let mut input = registry.open("silent", Role::Consumer).unwrap();
            read_greeting(&mut input)
        })
    };

    let output = registry.open("silent", Role::Producer).unwrap();
    output.close();

    assert_eq!(reader.join().unwrap(), Err(ChatError::NoGreeting));
}

#[test]
fn test_send_without_listener_is_broken_pipe() {
    let registry = registry();

    let listener = {
        let registry = registry.clone();
        thread::spawn(move || registry.open("gone", Role::Consumer).unwrap())
    };
    let mut output = registry.open("gone", Role::Producer).unwrap();
    drop(listener.join().unwrap());

    assert_eq!(
        send_session(&mut output, "bob", Vec::new()),
        Err(ChatError::Io(embedded_io::ErrorKind::BrokenPipe))
    );
}
