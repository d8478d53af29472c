//! Wire format for the accounting record RLW writes to the sync pipe.
//!
//! Exactly 32 bytes, host byte order: `exit_status:i32 | user_time_us:u64 |
//! sys_time_us:u64 | peak_rss_kib:u64`. The struct is intentionally encoded
//! by hand (not via `#[repr(C)]`) so the wire size does not depend on
//! target-specific struct padding rules.

use std::convert::TryInto;

pub const RECORD_LEN: usize = 32;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AccountingRecord {
    pub exit_status: i32,
    pub user_time_us: u64,
    pub sys_time_us: u64,
    pub peak_rss_kib: u64,
}

impl AccountingRecord {
    pub fn encode(&self) -> [u8; RECORD_LEN] {
        let mut buf = [0u8; RECORD_LEN];
        buf[0..4].copy_from_slice(&self.exit_status.to_ne_bytes());
        // 4 bytes of padding to keep the u64 fields 8-byte aligned within the record.
        buf[8..16].copy_from_slice(&self.user_time_us.to_ne_bytes());
        buf[16..24].copy_from_slice(&self.sys_time_us.to_ne_bytes());
        buf[24..32].copy_from_slice(&self.peak_rss_kib.to_ne_bytes());
        buf
    }

    /// Decodes a record from exactly `RECORD_LEN` bytes.
    ///
    /// # Panics
    /// Panics if `buf.len() != RECORD_LEN`; callers are expected to have
    /// already validated the read length (a short read is a distinct,
    /// recoverable error — see [`crate::error::Error::ShortAccountingRead`]).
    pub fn decode(buf: &[u8]) -> Self {
        assert_eq!(buf.len(), RECORD_LEN);
        let exit_status = i32::from_ne_bytes(buf[0..4].try_into().unwrap());
        let user_time_us = u64::from_ne_bytes(buf[8..16].try_into().unwrap());
        let sys_time_us = u64::from_ne_bytes(buf[16..24].try_into().unwrap());
        let peak_rss_kib = u64::from_ne_bytes(buf[24..32].try_into().unwrap());
        AccountingRecord {
            exit_status,
            user_time_us,
            sys_time_us,
            peak_rss_kib,
        }
    }
}
