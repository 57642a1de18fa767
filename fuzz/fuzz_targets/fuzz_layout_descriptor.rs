#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use mosaic_core::ids::{SequentialIds, TokenId};
use mosaic_layout::{LayoutDescriptor, LayoutParser, SectionLayout, encode_parsed};

#[derive(Debug, Arbitrary)]
struct Input {
    token_count: u8,
    sections: Vec<u16>,
    layout: Vec<(Option<u8>, Vec<u16>)>,
}

fuzz_target!(|input: Input| {
    // Cap sizes to keep fuzzing fast.
    if input.sections.len() > 64 || input.layout.len() > 64 {
        return;
    }
    let tokens: Vec<TokenId> = (0..input.token_count)
        .map(|i| TokenId::new(i.to_string()))
        .collect();
    let layout = LayoutDescriptor {
        sections: input.sections.iter().map(|&s| usize::from(s)).collect(),
        section_layout: input
            .layout
            .iter()
            .map(|(columns, whitespace)| SectionLayout {
                columns: columns.map(usize::from),
                whitespace: whitespace.iter().take(64).map(|&w| usize::from(w)).collect(),
            })
            .collect(),
    };

    // Diagnostics and parsing must never panic.
    let _report = layout.report(tokens.len());
    let parsed = LayoutParser::default().parse(&tokens, &layout, &mut SequentialIds::default());

    // Healing never drops or duplicates tokens.
    let recovered: Vec<&TokenId> = parsed.tokens().collect();
    assert_eq!(recovered.len(), tokens.len(), "token count changed");
    assert!(recovered.iter().zip(&tokens).all(|(a, b)| *a == b), "token order changed");

    for section in &parsed.sections {
        assert!(section.columns >= 1, "zero columns after healing");
        for (index, row) in section.rows.iter().enumerate() {
            assert!(!row.items.is_empty(), "empty row");
            if index + 1 < section.rows.len() {
                assert_eq!(row.items.len(), section.columns, "short inner row");
            }
        }
    }

    // Encoding the healed structure yields a descriptor that needs no healing
    // and parses back to the same encoding.
    let encoded = encode_parsed(&parsed);
    assert!(
        encoded.layout.validate_strict(encoded.tokens.len()).is_ok(),
        "encoded descriptor not clean: {:?}",
        encoded.layout
    );
    let reparsed = LayoutParser::default().parse(
        &encoded.tokens,
        &encoded.layout,
        &mut SequentialIds::default(),
    );
    assert_eq!(encode_parsed(&reparsed), encoded, "encode/parse not idempotent");
});
