use super::Payload;
use crate::descriptor::{Descriptor, DescriptorBody};
use crate::error::Result;
use std::io::Read;

/// `esds`: a full box wrapping one ES descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EsdsBox {
    pub descriptor: Option<Descriptor>,
}

impl EsdsBox {
    pub fn summary(&self) -> Option<String> {
        let d = self.descriptor.as_ref()?;
        let DescriptorBody::ElementaryStream(es) = &d.body else {
            return Some(format!("descriptor tag=0x{:02x}", d.tag()));
        };
        let mut s = format!("es_id={}", es.es_id);
        if let Some(dc) = es.decoder_config() {
            s.push_str(&format!(
                " object_type=0x{:02x} stream_type={} max_bitrate={} avg_bitrate={}",
                dc.object_type_indication, dc.stream_type, dc.max_bitrate, dc.avg_bitrate
            ));
            if let Some(info) = dc.specific_info_bytes() {
                s.push_str(&format!(" specific_info={}", hex::encode(info)));
            }
        }
        Some(s)
    }
}

impl Payload for EsdsBox {
    fn read_payload(&mut self, r: &mut dyn Read, _version: u8) -> Result<()> {
        let mut first = [0u8; 1];
        if r.read(&mut first)? == 0 {
            self.descriptor = None;
            return Ok(());
        }
        let mut chained = (&first[..]).chain(r);
        self.descriptor = Some(Descriptor::read(&mut chained)?);
        Ok(())
    }

    fn write_payload(&self, out: &mut Vec<u8>, _version: u8) -> Result<()> {
        match &self.descriptor {
            Some(d) => d.write(out),
            None => Ok(()),
        }
    }

    fn payload_size(&self, _version: u8) -> u64 {
        self.descriptor.as_ref().map_or(0, Descriptor::size)
    }
}
