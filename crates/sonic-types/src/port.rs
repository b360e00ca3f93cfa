//! Port identifiers and the port bitmaps drivers report VLAN membership in.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical front-panel port number as used by the switch driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(u32);

impl PortId {
    pub const fn new(id: u32) -> Self {
        PortId(id)
    }

    pub const fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PortId {
    fn from(id: u32) -> Self {
        PortId(id)
    }
}

const WORDS: usize = 4;

/// Fixed-width set of ports, the shape VLAN membership comes back in from
/// the driver.
///
/// Serialized as an ascending list of port numbers.
///
/// ```
/// use sonic_types::{PortBitmap, PortId};
///
/// let pbmp = PortBitmap::from_ports([3, 1, 130]).unwrap();
/// assert_eq!(pbmp.count(), 3);
/// assert!(pbmp.contains(PortId::new(130)));
/// assert_eq!(pbmp.iter().map(|p| p.as_u32()).collect::<Vec<_>>(), vec![1, 3, 130]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct PortBitmap([u64; WORDS]);

impl PortBitmap {
    /// Number of ports a bitmap can describe.
    pub const CAPACITY: u32 = (WORDS * 64) as u32;

    pub const fn new() -> Self {
        PortBitmap([0; WORDS])
    }

    /// Builds a bitmap from raw port numbers.
    ///
    /// # Errors
    ///
    /// Returns an error for a port number beyond [`Self::CAPACITY`].
    pub fn from_ports(ports: impl IntoIterator<Item = u32>) -> Result<Self, ParseError> {
        let mut pbmp = Self::new();
        for port in ports {
            pbmp.insert(PortId(port))?;
        }
        Ok(pbmp)
    }

    pub fn insert(&mut self, port: PortId) -> Result<(), ParseError> {
        let (word, bit) = Self::locate(port).ok_or(ParseError::InvalidPort(port.0))?;
        self.0[word] |= 1u64 << bit;
        Ok(())
    }

    pub fn contains(&self, port: PortId) -> bool {
        match Self::locate(port) {
            Some((word, bit)) => self.0[word] & (1u64 << bit) != 0,
            None => false,
        }
    }

    pub fn count(&self) -> u32 {
        self.0.iter().map(|w| w.count_ones()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|w| *w == 0)
    }

    /// Iterates member ports in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = PortId> + '_ {
        (0..Self::CAPACITY)
            .map(PortId)
            .filter(move |port| self.contains(*port))
    }

    fn locate(port: PortId) -> Option<(usize, u32)> {
        (port.0 < Self::CAPACITY).then(|| ((port.0 / 64) as usize, port.0 % 64))
    }
}

impl TryFrom<Vec<u32>> for PortBitmap {
    type Error = ParseError;

    fn try_from(ports: Vec<u32>) -> Result<Self, Self::Error> {
        Self::from_ports(ports)
    }
}

impl From<PortBitmap> for Vec<u32> {
    fn from(pbmp: PortBitmap) -> Vec<u32> {
        pbmp.iter().map(|p| p.as_u32()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_and_contains() {
        let mut pbmp = PortBitmap::new();
        assert!(pbmp.is_empty());
        pbmp.insert(PortId::new(0)).unwrap();
        pbmp.insert(PortId::new(63)).unwrap();
        pbmp.insert(PortId::new(64)).unwrap();
        pbmp.insert(PortId::new(64)).unwrap();

        assert_eq!(pbmp.count(), 3);
        assert!(pbmp.contains(PortId::new(63)));
        assert!(!pbmp.contains(PortId::new(65)));
        assert!(!pbmp.contains(PortId::new(9999)));
    }

    #[test]
    fn test_out_of_range_port() {
        assert_eq!(
            PortBitmap::from_ports([PortBitmap::CAPACITY]),
            Err(ParseError::InvalidPort(PortBitmap::CAPACITY))
        );
    }

    #[test]
    fn test_serde_as_port_list() {
        let pbmp = PortBitmap::from_ports([5, 2]).unwrap();
        assert_eq!(serde_json::to_string(&pbmp).unwrap(), "[2,5]");
        let back: PortBitmap = serde_json::from_str("[5,2,2]").unwrap();
        assert_eq!(back, pbmp);
    }
}
