//! Integration tests against the live kernel.
//!
//! These only read kernel state and need no privileges, but they do need
//! a real NETLINK_ROUTE socket. Run with:
//! `cargo test -p rtsync --test integration --features integration`

#![cfg(feature = "integration")]

use rtsync::builder::MessageBuilder;
use rtsync::message::{MessageIter, NLM_F_DUMP, NLM_F_REQUEST, NlMsgType};
use rtsync::messages::LinkMessage;
use rtsync::socket::NetlinkSocket;
use rtsync::types::RtGenMsg;

const AF_UNSPEC: u8 = 0;

#[tokio::test]
async fn test_link_dump_reaches_terminator() {
    let socket = NetlinkSocket::open(0, 256 * 1024).expect("failed to open socket");

    let seq = socket.next_seq();
    let mut builder = MessageBuilder::new(NlMsgType::RTM_GETLINK, NLM_F_REQUEST | NLM_F_DUMP);
    builder.append_header(&RtGenMsg::new(AF_UNSPEC));
    builder.set_seq(seq);
    builder.set_pid(socket.pid());
    socket.send(&builder.finish()).await.unwrap();

    let mut names = Vec::new();
    'dump: loop {
        let data = socket.recv_msg().await.unwrap();
        for item in MessageIter::new(&data) {
            let (header, payload) = item.unwrap();
            assert_eq!(header.nlmsg_seq, seq);
            if header.is_done() {
                break 'dump;
            }
            assert_eq!(header.nlmsg_type, NlMsgType::RTM_NEWLINK);
            let link = LinkMessage::parse(payload).unwrap();
            if let Some(name) = link.name() {
                names.push(name.to_string());
            }
        }
    }

    // Loopback always exists.
    assert!(names.iter().any(|n| n == "lo"));
}

#[tokio::test]
async fn test_each_socket_gets_distinct_port() {
    let a = NetlinkSocket::open(0, 64 * 1024).unwrap();
    let b = NetlinkSocket::open(0, 64 * 1024).unwrap();
    assert_ne!(a.pid(), b.pid());
}
