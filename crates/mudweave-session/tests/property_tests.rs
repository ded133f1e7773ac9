//! Property-based tests for the byte-level plumbing.

use proptest::prelude::*;

use mudweave_session::{LineQueue, TelnetFilter, Utf8Decoder};

const IAC: u8 = 255;

fn filter_in_chunks(bytes: &[u8], cut: usize) -> (Vec<u8>, Vec<u8>) {
    let mut filter = TelnetFilter::new();
    let cut = cut.min(bytes.len());
    let first = filter.feed(&bytes[..cut]);
    let second = filter.feed(&bytes[cut..]);
    (
        [first.data, second.data].concat(),
        [first.replies, second.replies].concat(),
    )
}

proptest! {
    #[test]
    fn plain_bytes_pass_unchanged(bytes in prop::collection::vec(0u8..255, 0..200)) {
        let mut filter = TelnetFilter::new();
        let out = filter.feed(&bytes);
        prop_assert_eq!(out.data, bytes);
        prop_assert!(out.replies.is_empty());
    }

    #[test]
    fn chunking_does_not_change_filtering(
        bytes in prop::collection::vec(prop_oneof![Just(IAC), any::<u8>()], 0..200),
        cut in 0usize..200,
    ) {
        let mut whole = TelnetFilter::new();
        let expected = whole.feed(&bytes);
        let (data, replies) = filter_in_chunks(&bytes, cut);
        prop_assert_eq!(data, expected.data);
        prop_assert_eq!(replies, expected.replies);
    }

    #[test]
    fn chunking_does_not_change_decoding(text in "\\PC{0,60}", cut in 0usize..240) {
        let bytes = text.as_bytes();
        let cut = cut.min(bytes.len());
        let mut decoder = Utf8Decoder::new();
        let mut decoded = decoder.decode(&bytes[..cut]);
        decoded.push_str(&decoder.decode(&bytes[cut..]));
        prop_assert_eq!(decoded, text);
        prop_assert!(!decoder.has_pending());
    }

    #[test]
    fn queue_drain_returns_writes_in_order(parts in prop::collection::vec("[a-z ]{0,12}", 0..20)) {
        let queue = LineQueue::new();
        for part in &parts {
            queue.write(part);
        }
        prop_assert_eq!(queue.read(false), parts.concat());
        prop_assert_eq!(queue.read(false), "");
    }
}
