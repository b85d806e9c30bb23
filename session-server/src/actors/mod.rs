// session-server/src/actors/mod.rs

pub mod bridge_actor;
pub mod flow_actor;
