//! Typed events parsed out of rtnetlink notifications.

use crate::error::Result;
use crate::message::NlMsgType;
use crate::messages::{AddressMessage, LinkMessage, RouteMessage};

/// One kernel notification this engine knows how to handle.
#[derive(Debug, Clone)]
pub enum RtnlEvent {
    /// Interface created or state changed.
    NewLink(LinkMessage),
    /// Interface removed.
    DelLink(LinkMessage),
    /// Address added to an interface.
    NewAddress(AddressMessage),
    /// Address removed from an interface.
    DelAddress(AddressMessage),
    /// Route added.
    NewRoute(RouteMessage),
    /// Route removed.
    DelRoute(RouteMessage),
}

/// Map a message type and payload to a typed event.
///
/// Returns `Ok(None)` for message types without a handler; the caller
/// decides whether that is a terminator, an error message, or something
/// to log and skip.
pub fn parse_event(msg_type: u16, payload: &[u8]) -> Result<Option<RtnlEvent>> {
    let event = match msg_type {
        NlMsgType::RTM_NEWLINK => Some(RtnlEvent::NewLink(LinkMessage::parse(payload)?)),
        NlMsgType::RTM_DELLINK => Some(RtnlEvent::DelLink(LinkMessage::parse(payload)?)),
        NlMsgType::RTM_NEWADDR => Some(RtnlEvent::NewAddress(AddressMessage::parse(payload)?)),
        NlMsgType::RTM_DELADDR => Some(RtnlEvent::DelAddress(AddressMessage::parse(payload)?)),
        NlMsgType::RTM_NEWROUTE => Some(RtnlEvent::NewRoute(RouteMessage::parse(payload)?)),
        NlMsgType::RTM_DELROUTE => Some(RtnlEvent::DelRoute(RouteMessage::parse(payload)?)),
        _ => None,
    };
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, nlmsg_align};
    use crate::types::route::{RtMsg, rt_table};
    use zerocopy::IntoBytes;

    fn message(msg_type: u16, payload: &[u8]) -> Vec<u8> {
        let mut hdr = NlMsgHdr::new(msg_type, 0);
        hdr.nlmsg_len = (NLMSG_HDRLEN + payload.len()) as u32;
        let mut buf = hdr.as_bytes().to_vec();
        buf.extend_from_slice(payload);
        buf.resize(nlmsg_align(buf.len()), 0);
        buf
    }

    fn route_record() -> Vec<u8> {
        let header = RtMsg {
            rtm_family: libc::AF_INET as u8,
            rtm_table: rt_table::MAIN as u8,
            ..Default::default()
        };
        message(NlMsgType::RTM_NEWROUTE, header.as_bytes())
    }

    #[test]
    fn test_unhandled_types_yield_no_event() {
        assert!(parse_event(NlMsgType::DONE, &[]).unwrap().is_none());
        assert!(parse_event(NlMsgType::RTM_NEWRULE, &[]).unwrap().is_none());
    }

    // An enumeration reply of M records plus a terminator dispatches
    // exactly M events; the terminator never reaches a handler.
    #[test]
    fn test_dump_reply_dispatches_each_record_once() {
        let mut stream = Vec::new();
        for _ in 0..5 {
            stream.extend_from_slice(&route_record());
        }
        stream.extend_from_slice(&message(NlMsgType::DONE, &[0, 0, 0, 0]));

        let mut events = 0;
        let mut terminators = 0;
        for item in MessageIter::new(&stream) {
            let (header, payload) = item.unwrap();
            match parse_event(header.nlmsg_type, payload).unwrap() {
                Some(RtnlEvent::NewRoute(_)) => events += 1,
                Some(_) => panic!("unexpected event kind"),
                None => {
                    assert!(header.is_done());
                    terminators += 1;
                }
            }
        }
        assert_eq!(events, 5);
        assert_eq!(terminators, 1);
    }
}
