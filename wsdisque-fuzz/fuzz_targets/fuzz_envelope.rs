#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use wsdisque_proto::{dispatch, Envelope, SessionEvent};

fuzz_target!(|data: &[u8]| {
    let input = Bytes::copy_from_slice(data);
    if let Ok(envelope) = Envelope::decode(&input) {
        // Decoding is lossless
        assert_eq!(envelope.encode(), input);

        let mut events: Vec<SessionEvent> = Vec::new();
        dispatch(envelope, &mut events);
        assert!(events.len() <= 1);
    }
});
