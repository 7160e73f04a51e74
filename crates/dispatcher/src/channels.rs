//! Output channel subscription

use contracts::{OdometryOutput, OutputChannel};

/// Set of outward channels a sink subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSet {
    odometry: bool,
    pose: bool,
    transform: bool,
}

impl ChannelSet {
    /// All three channels
    pub fn all() -> Self {
        Self {
            odometry: true,
            pose: true,
            transform: true,
        }
    }

    pub fn from_channels(channels: &[OutputChannel]) -> Self {
        let mut set = Self {
            odometry: false,
            pose: false,
            transform: false,
        };
        for channel in channels {
            match channel {
                OutputChannel::Odometry => set.odometry = true,
                OutputChannel::Pose => set.pose = true,
                OutputChannel::Transform => set.transform = true,
            }
        }
        set
    }

    pub fn contains(&self, channel: OutputChannel) -> bool {
        match channel {
            OutputChannel::Odometry => self.odometry,
            OutputChannel::Pose => self.pose,
            OutputChannel::Transform => self.transform,
        }
    }

    /// Whether `output` carries at least one subscribed record
    pub fn accepts(&self, output: &OdometryOutput) -> bool {
        self.odometry || self.pose || (self.transform && output.transform.is_some())
    }
}

impl Default for ChannelSet {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_channels() {
        let set = ChannelSet::from_channels(&[OutputChannel::Pose]);
        assert!(set.contains(OutputChannel::Pose));
        assert!(!set.contains(OutputChannel::Odometry));
        assert!(!set.contains(OutputChannel::Transform));
        assert_eq!(ChannelSet::from_channels(&OutputChannel::ALL), ChannelSet::all());
    }
}
