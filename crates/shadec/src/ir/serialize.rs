//! Binary container for compiled modules
//!
//! Layout (integers little-endian unless noted):
//!
//! | offset | size | field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | magic `SHDR`                            |
//! | 4      | 2    | format version                          |
//! | 6      | 2    | flags (reserved, 0)                     |
//! | 8      | 4    | payload length                          |
//! | 12     | n    | payload: textual module dump (UTF-8)    |
//! | 12+n   | 2    | checksum of bytes 0..12+n (big-endian)  |

use tracing::debug;

use super::IrModule;
use crate::common::{CompileError, CompileResult};

pub const CONTAINER_MAGIC: [u8; 4] = *b"SHDR";
pub const CONTAINER_VERSION: u16 = 1;

const HEADER_LEN: usize = 12;
const CHECKSUM_LEN: usize = 2;

/// 16-bit sum of big-endian words; an odd trailing byte is padded with 0
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    for chunk in data.chunks(2) {
        let word = if chunk.len() == 2 {
            ((chunk[0] as u32) << 8) | (chunk[1] as u32)
        } else {
            (chunk[0] as u32) << 8
        };
        sum = sum.wrapping_add(word);
    }
    (sum & 0xFFFF) as u16
}

/// Wrap `module` into a container
pub fn serialize(module: &IrModule) -> Vec<u8> {
    let payload = module.to_string().into_bytes();

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    bytes.extend_from_slice(&CONTAINER_MAGIC);
    bytes.extend_from_slice(&CONTAINER_VERSION.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&payload);

    let sum = checksum(&bytes);
    bytes.extend_from_slice(&sum.to_be_bytes());

    debug!(module = %module.name, size = bytes.len(), "serialized module");
    bytes
}

/// Validate a container and return its payload text
pub fn verify_container(bytes: &[u8]) -> CompileResult<&str> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(CompileError::container(format!(
            "{} bytes is shorter than the header",
            bytes.len()
        )));
    }
    if bytes[0..4] != CONTAINER_MAGIC {
        return Err(CompileError::container("bad magic"));
    }

    let version = u16::from_le_bytes([bytes[4], bytes[5]]);
    if version != CONTAINER_VERSION {
        return Err(CompileError::container(format!(
            "unsupported version {}",
            version
        )));
    }

    let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
    let end = HEADER_LEN + len;
    if bytes.len() != end + CHECKSUM_LEN {
        return Err(CompileError::container(format!(
            "payload length {} does not match container size {}",
            len,
            bytes.len()
        )));
    }

    let stored = u16::from_be_bytes([bytes[end], bytes[end + 1]]);
    let calculated = checksum(&bytes[..end]);
    if stored != calculated {
        return Err(CompileError::container(format!(
            "checksum mismatch: stored {:#06x}, calculated {:#06x}",
            stored, calculated
        )));
    }

    std::str::from_utf8(&bytes[HEADER_LEN..end])
        .map_err(|e| CompileError::container(format!("payload is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::IrGlobal;
    use crate::types::IrType;

    fn sample() -> IrModule {
        let mut module = IrModule::new("sample");
        module.globals.push(IrGlobal {
            name: "g".to_string(),
            ty: IrType::i32(),
            init: None,
        });
        module
    }

    #[test]
    fn test_checksum_words() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[0x12, 0x34]), 0x1234);
        assert_eq!(checksum(&[0x12, 0x34, 0x01]), 0x1334);
        assert_eq!(checksum(&[0xFF, 0xFF, 0x00, 0x02]), 0x0001);
    }

    #[test]
    fn test_header_layout() {
        let bytes = serialize(&sample());
        assert_eq!(&bytes[0..4], b"SHDR");
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), CONTAINER_VERSION);
        let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize;
        assert_eq!(bytes.len(), 12 + len + 2);
    }

    #[test]
    fn test_verify_returns_module_text() {
        let module = sample();
        let bytes = serialize(&module);
        assert_eq!(verify_container(&bytes).unwrap(), module.to_string());
    }

    #[test]
    fn test_corruption_detected() {
        let mut bytes = serialize(&sample());
        let last_payload = bytes.len() - 3;
        bytes[last_payload] ^= 0x01;
        assert!(matches!(verify_container(&bytes), Err(CompileError::Container { .. })));

        let mut bytes = serialize(&sample());
        bytes[0] = b'X';
        assert!(verify_container(&bytes).is_err());

        let bytes = serialize(&sample());
        assert!(verify_container(&bytes[..bytes.len() - 1]).is_err());
    }
}
