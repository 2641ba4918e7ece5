//! Channel status and the derived pair status.

use serde::Serialize;
use std::fmt;

/// Live data kind; one push channel per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Price,
    Attention,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Attention => "attention",
        }
    }

    pub fn all() -> [ChannelKind; 2] {
        [Self::Price, Self::Attention]
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of one push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Error,
    /// Terminal: the channel could not be constructed.
    Unavailable,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
            Self::Unavailable => "unavailable",
        }
    }

    pub fn is_connected(&self) -> bool {
        *self == Self::Connected
    }

    pub fn all() -> [ConnectionStatus; 5] {
        [
            Self::Connecting,
            Self::Connected,
            Self::Disconnected,
            Self::Error,
            Self::Unavailable,
        ]
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single status shown for the price/attention pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PairStatus {
    Healthy,
    Degraded,
    Checking,
    Unhealthy,
}

impl PairStatus {
    /// Pure derivation from the two channel statuses.
    pub fn derive(price: ConnectionStatus, attention: ConnectionStatus) -> Self {
        use ConnectionStatus::{Connected, Connecting};
        match (price, attention) {
            (Connected, Connected) => Self::Healthy,
            (Connected, _) | (_, Connected) => Self::Degraded,
            (Connecting, _) | (_, Connecting) => Self::Checking,
            _ => Self::Unhealthy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Checking => "checking",
            Self::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for PairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Both channel statuses, published as one value so readers never see a
/// half-updated pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConnectionSnapshot {
    pub price: ConnectionStatus,
    pub attention: ConnectionStatus,
}

impl ConnectionSnapshot {
    pub fn get(&self, kind: ChannelKind) -> ConnectionStatus {
        match kind {
            ChannelKind::Price => self.price,
            ChannelKind::Attention => self.attention,
        }
    }

    /// Returns true if the value changed.
    pub fn set(&mut self, kind: ChannelKind, status: ConnectionStatus) -> bool {
        let slot = match kind {
            ChannelKind::Price => &mut self.price,
            ChannelKind::Attention => &mut self.attention,
        };
        let changed = *slot != status;
        *slot = status;
        changed
    }

    pub fn pair(&self) -> PairStatus {
        PairStatus::derive(self.price, self.attention)
    }
}

impl Default for ConnectionSnapshot {
    fn default() -> Self {
        Self {
            price: ConnectionStatus::Disconnected,
            attention: ConnectionStatus::Disconnected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionStatus::*;

    fn expected(price: ConnectionStatus, attention: ConnectionStatus) -> PairStatus {
        let connected = [price, attention].iter().filter(|s| s.is_connected()).count();
        if connected == 2 {
            PairStatus::Healthy
        } else if connected == 1 {
            PairStatus::Degraded
        } else if price == Connecting || attention == Connecting {
            PairStatus::Checking
        } else {
            PairStatus::Unhealthy
        }
    }

    #[test]
    fn test_all_combinations() {
        for price in ConnectionStatus::all() {
            for attention in ConnectionStatus::all() {
                assert_eq!(
                    PairStatus::derive(price, attention),
                    expected(price, attention),
                    "price={price} attention={attention}"
                );
            }
        }
    }

    #[test]
    fn test_core_grid() {
        let cases = [
            (Connected, Connected, PairStatus::Healthy),
            (Connected, Connecting, PairStatus::Degraded),
            (Connected, Disconnected, PairStatus::Degraded),
            (Connecting, Connected, PairStatus::Degraded),
            (Connecting, Connecting, PairStatus::Checking),
            (Connecting, Disconnected, PairStatus::Checking),
            (Disconnected, Connected, PairStatus::Degraded),
            (Disconnected, Connecting, PairStatus::Checking),
            (Disconnected, Disconnected, PairStatus::Unhealthy),
        ];
        for (price, attention, pair) in cases {
            assert_eq!(PairStatus::derive(price, attention), pair);
        }
    }

    #[test]
    fn test_error_and_unavailable_are_unhealthy() {
        assert_eq!(PairStatus::derive(Error, Unavailable), PairStatus::Unhealthy);
        assert_eq!(PairStatus::derive(Unavailable, Unavailable), PairStatus::Unhealthy);
        assert_eq!(PairStatus::derive(Error, Connecting), PairStatus::Checking);
    }

    #[test]
    fn test_snapshot_set_reports_change() {
        let mut snapshot = ConnectionSnapshot::default();
        assert!(snapshot.set(ChannelKind::Price, Connected));
        assert!(!snapshot.set(ChannelKind::Price, Connected));
        assert_eq!(snapshot.get(ChannelKind::Price), Connected);
        assert_eq!(snapshot.pair(), PairStatus::Degraded);
    }
}
