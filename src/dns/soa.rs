use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};
use tracing::trace;

use super::WireError;
use super::header::DnsHeader;
use crate::serial::Serial;

pub const TYPE_SOA: u16 = 6;
pub const CLASS_IN: u16 = 1;

/// Encodes a non-recursive `zone IN SOA` query
pub fn encode_query(id: u16, zone: &str) -> Result<Vec<u8>, WireError> {
    let labels: Vec<&str> = zone
        .trim_end_matches('.')
        .split('.')
        .filter(|l| !l.is_empty())
        .collect();
    let wire_len: usize = labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1;
    if wire_len > 255 || labels.iter().any(|l| l.len() > 63) {
        return Err(WireError::InvalidName(zone.to_string()));
    }

    let mut buf = Vec::with_capacity(12 + wire_len + 4);
    {
        let mut writer: BitWriter<&mut Vec<u8>, BigEndian> = BitWriter::new(&mut buf);
        DnsHeader::query(id).write(&mut writer)?;
        for label in &labels {
            writer.write_var::<u8>(8, label.len() as u8)?;
            writer.write_bytes(label.as_bytes())?;
        }
        writer.write_var::<u8>(8, 0)?;
        writer.write_var::<u16>(16, TYPE_SOA)?;
        writer.write_var::<u16>(16, CLASS_IN)?;
    }
    Ok(buf)
}

/// Extracts the SOA serial from the answer section of a response to the
/// query with `expected_id`.
pub fn decode_serial(expected_id: u16, packet: &[u8]) -> Result<Serial, WireError> {
    let mut reader = BitReader::<_, BigEndian>::new(packet);
    let header = DnsHeader::read(&mut reader)?;
    trace!(
        "SOA response: id={}, rcode={}, answers={}",
        header.id, header.rcode, header.ancount
    );

    if header.id != expected_id || !header.qr {
        return Err(WireError::UnexpectedResponse);
    }
    if header.tc {
        return Err(WireError::Truncated);
    }
    if header.rcode != 0 {
        return Err(WireError::Rcode(header.rcode));
    }

    for _ in 0..header.qdcount {
        skip_name(&mut reader)?;
        reader.read_var::<u32>(32)?;
    }

    for _ in 0..header.ancount {
        skip_name(&mut reader)?;
        let rtype = reader.read_var::<u16>(16)?;
        let _class = reader.read_var::<u16>(16)?;
        let _ttl = reader.read_var::<u32>(32)?;
        let rdlength = reader.read_var::<u16>(16)?;
        if rtype == TYPE_SOA {
            skip_name(&mut reader)?; // MNAME
            skip_name(&mut reader)?; // RNAME
            return Ok(Serial(reader.read_var::<u32>(32)?));
        }
        let mut rdata = vec![0; rdlength as usize];
        reader.read_bytes(&mut rdata)?;
    }

    Err(WireError::NoSoa)
}

// Compression pointers end a name, so nothing needs to be followed.
fn skip_name(reader: &mut BitReader<&[u8], BigEndian>) -> Result<(), WireError> {
    loop {
        let len = reader.read_var::<u8>(8)?;
        match len & 0xC0 {
            0xC0 => {
                reader.read_var::<u8>(8)?;
                return Ok(());
            }
            0x00 if len == 0 => return Ok(()),
            0x00 => {
                let mut label = vec![0; len as usize];
                reader.read_bytes(&mut label)?;
            }
            _ => return Err(WireError::InvalidLabel),
        }
    }
}
