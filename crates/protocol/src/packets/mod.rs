//! Message definitions for the mazerun protocol.
//!
//! Every frame is a JSON text message of the form
//! `{"event": "<name>", "data": <payload>}`. This module contains both
//! client->server and server->client message types.

mod client;
mod server;

pub use client::*;
pub use server::*;

use serde::{Deserialize, Serialize};

/// A plain `{x, y, z}` triple as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl From<glam::Vec3> for Point3 {
    fn from(v: glam::Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Point3> for glam::Vec3 {
    fn from(p: Point3) -> Self {
        glam::Vec3::new(p.x, p.y, p.z)
    }
}
