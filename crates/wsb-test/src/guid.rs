//! GUID generation in the remote application's `{XXXXXXXX-XXXX-...}` format

use rand::Rng;

/// Generate a brace-wrapped uppercase GUID
pub fn random_guid<R: Rng + ?Sized>(rng: &mut R) -> String {
    let bytes: [u8; 16] = rng.gen();
    let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
    format!(
        "{{{}-{}-{}-{}-{}}}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}
