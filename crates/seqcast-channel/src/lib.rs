#![forbid(unsafe_code)]

//! Replay-latest multicast channel.
//!
//! # Role in seqcast
//! `seqcast-channel` is the broadcast layer. It fans a published value out to
//! every live subscriber and remembers the most recent value so that late
//! subscribers start from the current state instead of an empty one.
//!
//! # Primary responsibilities
//! - **ReplayChannel**: synchronous, ordered fan-out with replay of the latest
//!   value and a one-shot completion signal.
//! - **Subscription**: RAII guard; dropping it stops delivery.
//! - **Notification**: what a subscriber callback receives.
//!
//! # How it fits in the system
//! `seqcast` owns two channels per observable sequence (snapshots and change
//! events). The channel knows nothing about sequences; it only guarantees the
//! delivery contract.

pub mod replay;
pub mod subscription;

pub use replay::{ChannelClosed, Notification, ReplayChannel};
pub use subscription::Subscription;
