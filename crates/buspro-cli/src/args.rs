//! Argument value parsers.

use buspro_core::{Address, OperateCode};

/// Parse `"subnet.device[.channel...]"`. Segments after the device are
/// accepted and ignored.
pub fn parse_address(s: &str) -> Result<Address, String> {
    let mut parts = s.trim().split('.');
    let subnet = parts.next().unwrap_or_default();
    let device = parts
        .next()
        .ok_or_else(|| format!("invalid address '{}': expected subnet.device", s))?;

    let subnet: u8 = subnet
        .parse()
        .map_err(|_| format!("invalid address '{}': bad subnet '{}'", s, subnet))?;
    let device: u8 = device
        .parse()
        .map_err(|_| format!("invalid address '{}': bad device '{}'", s, device))?;

    for extra in parts {
        extra
            .parse::<u8>()
            .map_err(|_| format!("invalid address '{}': bad channel '{}'", s, extra))?;
    }
    Ok(Address::new(subnet, device))
}

/// Parse a hex (`0x0031`) or decimal (`49`) operate code.
pub fn parse_operate_code(s: &str) -> Result<OperateCode, String> {
    let s = s.trim();
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    value
        .map(OperateCode::new)
        .map_err(|_| format!("invalid operate code '{}'", s))
}

/// Parse a comma-separated byte list such as `1,100,0,0`. Empty means no
/// payload.
pub fn parse_payload(s: &str) -> Result<Vec<u8>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    s.split(',')
        .map(|b| {
            let b = b.trim();
            match b.strip_prefix("0x") {
                Some(hex) => u8::from_str_radix(hex, 16),
                None => b.parse(),
            }
            .map_err(|_| format!("invalid payload byte '{}'", b))
        })
        .collect()
}

/// Parse a wire frame written as hex, ignoring whitespace and colons.
pub fn parse_frame(s: &str) -> Result<Vec<u8>, String> {
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();
    hex::decode(&cleaned).map_err(|e| format!("invalid hex frame: {}", e))
}
