//! # CRC8-DVB-S2 Implementation
//!
//! CRC-8-DVB-S2 checksum calculation for RunCam Device Protocol frames.
//!
//! **Polynomial**: 0xD5 (x^8 + x^7 + x^6 + x^4 + x^2 + 1)
//! **Initial Value**: 0x00
//! **Bit order**: high bit first, no reflection

/// CRC-8-DVB-S2 polynomial
const CRC8_POLY: u8 = 0xD5;

/// Remainder table, one entry per byte value
const CRC8_TABLE: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = shift_out(i as u8);
        i += 1;
    }
    table
};

/// Run eight polynomial-division steps over `crc`, high bit first
const fn shift_out(mut crc: u8) -> u8 {
    let mut bit = 0;
    while bit < 8 {
        crc = if crc & 0x80 != 0 {
            (crc << 1) ^ CRC8_POLY
        } else {
            crc << 1
        };
        bit += 1;
    }
    crc
}

/// Calculate the CRC8-DVB-S2 checksum of `data`
///
/// Every RunCam frame ends with this checksum computed over all bytes that
/// precede it, header included.
///
/// # Examples
///
/// ```
/// use runcam_rcdevice::protocol::crc::crc8_dvb_s2;
///
/// // Header + GET_DEVICE_INFO
/// let crc = crc8_dvb_s2(&[0xCC, 0x00]);
/// assert_eq!(crc8_dvb_s2(&[0xCC, 0x00, crc]), 0);
/// ```
pub fn crc8_dvb_s2(data: &[u8]) -> u8 {
    data.iter()
        .fold(0u8, |crc, &byte| CRC8_TABLE[(crc ^ byte) as usize])
}

/// Table-free reference, kept to check the table against
#[cfg(test)]
fn crc8_dvb_s2_slow(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, &byte| shift_out(crc ^ byte))
}
