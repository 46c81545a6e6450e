//! Drop-based multipath channel generation and spectrum shaping for
//! 0.5 to 150 GHz links.
//!
//! Built on top of `raywave-core`, this crate draws time clusters,
//! spatial lobes and subpath rays for a node pair, synthesizes the MIMO
//! channel matrix for a pair of phased arrays and applies the result to
//! a transmit power spectral density with beamforming, Doppler and
//! per-band delay rotation.
//!
//! ```
//! use raywave_core::{Node, Position, Scenario};
//! use raywave_sim::{
//!     ChannelConfig, ChannelMatrixGenerator, PhasedArray, Psd, SpectrumApplier,
//! };
//!
//! let cfg = ChannelConfig { scenario: Scenario::Umi, ..ChannelConfig::default() };
//! let generator = ChannelMatrixGenerator::new(cfg).unwrap();
//! let mut applier = SpectrumApplier::new(generator);
//!
//! let tx = Node::stationary(0, Position { x: 0.0, y: 0.0, z: 10.0 });
//! let rx = Node::stationary(1, Position { x: 30.0, y: 0.0, z: 1.6 });
//! let tx_array = PhasedArray::uniform_planar(0, 4, 4, 0.5);
//! let rx_array = PhasedArray::uniform_planar(1, 2, 2, 0.5);
//!
//! let psd = Psd::flat(28.0e9, 100.0e6, 72, 0.01);
//! let rx_psd = applier.apply(&psd, &tx, &rx, &tx_array, &rx_array, 0.0);
//! assert!(rx_psd.total_power_w() > 0.0);
//! ```

pub mod antenna;
pub mod channel;
pub mod cluster;
pub mod params;
pub mod psd;
pub mod spectrum;

pub use antenna::PhasedArray;
pub use channel::{ChannelConfig, ChannelMatrix, ChannelMatrixGenerator, MAX_RF_BANDWIDTH_HZ};
pub use cluster::{ChannelParams, Ray};
pub use params::{AngleDistribution, AngleSpread, ScenarioParams};
pub use psd::{Band, Psd};
pub use spectrum::SpectrumApplier;
