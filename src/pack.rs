//! Packaging of compiled units into the files loaders read: the binary GCT file, and the text ini
//! of the Dolphin emulator.

use gck_asm::CompiledUnit;
use thiserror::Error;

pub const GCT_HEADER: [u8; 8] = [0x00, 0xd0, 0xc0, 0xde, 0x00, 0xd0, 0xc0, 0xde];
pub const GCT_FOOTER: [u8; 8] = [0xf0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

#[derive(Error, Debug)]
#[error("Line '{line}' of {name} isn't valid hex")]
pub struct PackError {
    name: String,
    line: String,
}

/// Decode a line of hex digits, ignoring whitespace.
fn decode_line(line: &str) -> Option<Vec<u8>> {
    let digits: Vec<u8> = line.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 || !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair).ok()?;
            u8::from_str_radix(pair, 16).ok()
        })
        .collect()
}

/// Pack `units` into a GCT file.
pub fn gct(units: &[CompiledUnit]) -> Result<Vec<u8>, PackError> {
    let mut bytes = GCT_HEADER.to_vec();
    for unit in units {
        debug!("packing {} into gct", unit.context.name);
        for line in &unit.lines {
            let decoded = decode_line(line).ok_or_else(|| PackError {
                name: unit.context.name.clone(),
                line: line.clone(),
            })?;
            bytes.extend(decoded);
        }
    }
    bytes.extend(GCT_FOOTER);
    Ok(bytes)
}

/// Pack `units` into a Dolphin ini, naming each code `$<prefix> | <name>`.
pub fn ini(units: &[CompiledUnit], prefix: &str) -> String {
    let mut text = String::from("[Gecko]\n");
    for unit in units {
        debug!("packing {} into ini", unit.context.name);
        text.push_str(&format!("${prefix} | {}\n", unit.context.name));
        text.push_str(&unit.code_text());
        text.push('\n');
    }
    text
}
