//! Tamper-detection digest over the mutable economic fields of a snapshot.
//!
//! The digest covers credits, cargo capacity, and the held cargo lines.
//! It is not cryptographic; it only flags casual save-file edits. The
//! decision to discard and rebuild on mismatch belongs to the persistence
//! gateway.

use crate::model::GameState;

/// Compute the digest for a snapshot.
///
/// Deterministic function of `credits`, `cargo.capacity`, and the ordered
/// cargo lines, folded through a 32-bit shift-add hash and printed as a
/// signed decimal.
pub fn digest(state: &GameState) -> String {
    let cargo = &state.player.ship.cargo;
    let items = cargo
        .items
        .iter()
        .map(|i| format!("{}x{}", i.good_id, i.quantity))
        .collect::<Vec<_>>()
        .join(",");
    let data = format!("{}-{}-[{}]", state.player.credits, cargo.capacity, items);

    let mut hash: i32 = 0;
    for ch in data.chars() {
        hash = hash
            .wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(ch as i32);
    }
    hash.to_string()
}

/// Recompute the digest and compare against the stored field.
pub fn verify(state: &GameState) -> bool {
    digest(state) == state.checksum
}
