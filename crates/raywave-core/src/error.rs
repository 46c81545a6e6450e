//! Error types shared across the propagation and channel layers.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ChannelError>;

/// Errors raised at model construction time.
///
/// Call-time misuse (co-located nodes, empty beamforming vectors) is a
/// programming error and panics instead; see the individual models.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelError {
    /// The carrier frequency lies outside the calibrated band. The
    /// empirical fits are measurement-based and have no fallback outside
    /// 0.5-150 GHz.
    #[error("carrier frequency {0:.3e} Hz is outside the calibrated 0.5-150 GHz band")]
    FrequencyOutOfBand(f64),

    /// The RF bandwidth is outside the supported 0-1000 MHz range.
    #[error("RF bandwidth {0:.3e} Hz is outside the supported 0-1000 MHz range")]
    BandwidthOutOfRange(f64),

    /// A scenario string did not name a known environment.
    #[error("unknown scenario `{0}`, expected one of: Umi, Uma, Rma, InH, InF")]
    UnknownScenario(String),
}
