#![forbid(unsafe_code)]

//! Observable sequences with structured change events.
//!
//! # Role in seqcast
//! `seqcast` owns the mutable collection. Each instance broadcasts two
//! streams through [`seqcast_channel::ReplayChannel`]:
//!
//! - **snapshots**: the full contents after every mutation,
//! - **changes**: a [`ChangeEvent`] describing exactly what moved.
//!
//! Both streams replay their latest value to late subscribers.
//!
//! # Example
//!
//! ```
//! use seqcast::{ChangeEvent, Notification, ObservableSequence};
//! use std::sync::{Arc, Mutex};
//!
//! let todos = ObservableSequence::new(vec!["write", "test"]);
//! let seen = Arc::new(Mutex::new(Vec::new()));
//! let sink = Arc::clone(&seen);
//! let _sub = todos.subscribe_changes(move |note| {
//!     if let Notification::Next(event) = note {
//!         sink.lock().unwrap().push(event.clone());
//!     }
//! });
//!
//! todos.append("ship").unwrap();
//! assert_eq!(*seen.lock().unwrap(), vec![ChangeEvent::insert(2, "ship")]);
//! assert_eq!(todos.current_value(), vec!["write", "test", "ship"]);
//! ```
//!
//! # Invariants
//!
//! 1. Every mutation publishes its change event(s) before its snapshot, and
//!    no other mutation's publications land in between.
//! 2. Insert indices are post-insertion positions; remove indices are
//!    pre-removal positions.
//! 3. Rejected calls change nothing and publish nothing.

pub mod change;
pub mod config;
pub mod error;
pub mod sequence;

pub use change::{ChangeEvent, ChangeKind, Leaves};
pub use config::{DisposePolicy, ReplacePolicy, SequenceConfig};
pub use error::{SequenceError, SequenceResult};
pub use sequence::ObservableSequence;
pub use seqcast_channel::{Notification, Subscription};
