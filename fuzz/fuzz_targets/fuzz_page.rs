//! Fuzz testing for page and tree value decoding.
//!
//! Interprets arbitrary bytes as a page in both header layouts and decodes
//! its tags into tree values.

#![no_main]

use libfuzzer_sys::fuzz_target;

use esedb::btree::Node;
use esedb::config::FormatOptions;

fuzz_target!(|data: &[u8]| {
    for extended in [false, true] {
        let format = FormatOptions::default().with_extended_page_header(extended);
        if let Ok(node) = Node::decode(7, data, &format) {
            for value in node.values() {
                let _ = value.key().len();
                let _ = value.child_page();
            }
            let _ = node.page().verify_checksum(&format);
        }
    }
});
