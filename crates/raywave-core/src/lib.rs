//! Large-scale propagation layer for the raywave channel simulator.
//!
//! Covers everything that happens before a multipath channel matrix is
//! drawn: the stochastic line-of-sight / non-line-of-sight condition of a
//! link, the closed-form path loss per scenario with spatially correlated
//! shadow fading, outdoor-to-indoor penetration, foliage loss, and
//! line-by-line gaseous attenuation for the 0.5-150 GHz band.
//!
//! # Example
//!
//! ```rust
//! use raywave_core::geometry::{Node, Position};
//! use raywave_core::scenario::Scenario;
//! use raywave_core::condition::{ConditionConfig, ConditionModel};
//! use raywave_core::path_loss::{PathLossConfig, PathLossModel};
//!
//! let tx = Node::stationary(0, Position::new(0.0, 0.0, 10.0));
//! let rx = Node::stationary(1, Position::new(1.0, 0.0, 1.6));
//!
//! let mut conditions = ConditionModel::new(ConditionConfig {
//!     scenario: Scenario::Umi,
//!     ..Default::default()
//! });
//! let cond = conditions.condition(&tx, &rx, 0.0);
//!
//! let mut path_loss = PathLossModel::new(PathLossConfig {
//!     scenario: Scenario::Umi,
//!     frequency_hz: 28.0e9,
//!     ..Default::default()
//! })
//! .unwrap();
//! let rx_dbm = path_loss.rx_power_dbm(10.0, &tx, &rx, &cond);
//! assert!(rx_dbm < 10.0);
//! ```

pub mod atmosphere;
pub mod condition;
pub mod error;
pub mod geometry;
pub mod path_loss;
pub mod scenario;

pub use condition::{ChannelCondition, ConditionConfig, ConditionModel, LosState};
pub use error::{ChannelError, Result};
pub use geometry::{Node, Position, Velocity, SPEED_OF_LIGHT};
pub use path_loss::{O2iLossType, PathLossConfig, PathLossModel};
pub use scenario::Scenario;
