//! Weapon table and pellet spread.

use glam::Vec3;
use protocol::Weapon;
use rand::Rng;

/// Server-side weapon characteristics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponStats {
    pub damage: i32,
    pub range: f32,
    pub pellets: u32,
    /// Per-axis jitter applied to each pellet's direction before renormalising.
    pub spread: f32,
}

pub const fn stats(weapon: Weapon) -> WeaponStats {
    match weapon {
        Weapon::Rifle => WeaponStats {
            damage: 25,
            range: 100.0,
            pellets: 1,
            spread: 0.0,
        },
        Weapon::Pistol => WeaponStats {
            damage: 15,
            range: 60.0,
            pellets: 1,
            spread: 0.01,
        },
        Weapon::Shotgun => WeaponStats {
            damage: 12,
            range: 25.0,
            pellets: 5,
            spread: 0.08,
        },
    }
}

/// Jitter a normalised direction inside a cube of half-width `spread` and
/// renormalise. Zero spread returns the direction unchanged.
pub fn jitter<R: Rng + ?Sized>(direction: Vec3, spread: f32, rng: &mut R) -> Vec3 {
    if spread <= 0.0 {
        return direction;
    }
    let offset = Vec3::new(
        rng.random_range(-spread..=spread),
        rng.random_range(-spread..=spread),
        rng.random_range(-spread..=spread),
    );
    let jittered = (direction + offset).normalize_or_zero();
    if jittered == Vec3::ZERO { direction } else { jittered }
}
