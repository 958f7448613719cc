use crate::DecodedEntry;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use smbus_transport::{SmbusBus, TransportError};

#[derive(Clone)]
pub struct BusMetrics {
    pub transactions: IntCounter,
    pub transport_errors: IntCounter,
    pub bytes_read: IntCounter,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub bus: BusMetrics,
    pub decode_errors: IntCounter,
    pub registers_loaded: IntGauge,
}

impl MetricsHub {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let transactions = IntCounter::new("gauge_smbus_transactions", "Total SMBus write-then-read transactions")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let transport_errors =
            IntCounter::new("gauge_smbus_transport_errors", "SMBus transactions that failed")
                .map_err(|e| format!("metrics init error: {e}"))?;
        let bytes_read = IntCounter::new("gauge_smbus_bytes_read", "Bytes read from the bus")
            .map_err(|e| format!("metrics init error: {e}"))?;
        let decode_errors =
            IntCounter::new("gauge_decode_errors", "Register decodes that produced an error")
                .map_err(|e| format!("metrics init error: {e}"))?;
        let registers_loaded =
            IntGauge::new("gauge_registers_loaded", "Number of registers in the active schema")
                .map_err(|e| format!("metrics init error: {e}"))?;
        let bus = BusMetrics {
            transactions,
            transport_errors,
            bytes_read,
        };
        let _ = registry.register(Box::new(bus.transactions.clone()));
        let _ = registry.register(Box::new(bus.transport_errors.clone()));
        let _ = registry.register(Box::new(bus.bytes_read.clone()));
        let _ = registry.register(Box::new(decode_errors.clone()));
        let _ = registry.register(Box::new(registers_loaded.clone()));
        Ok(Self {
            registry,
            bus,
            decode_errors,
            registers_loaded,
        })
    }

    /// Wrap `inner` so every transaction is counted by this hub.
    pub fn wrap<B: SmbusBus>(&self, inner: B) -> MeteredBus<B> {
        MeteredBus {
            inner,
            metrics: self.bus.clone(),
        }
    }

    pub fn record_entries(&self, entries: &[DecodedEntry<'_>]) {
        let failed = entries.iter().filter(|e| !e.is_ok()).count();
        self.decode_errors.inc_by(failed as u64);
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

/// A bus decorator that counts transactions, failures and bytes read.
pub struct MeteredBus<B> {
    inner: B,
    metrics: BusMetrics,
}

impl<B> MeteredBus<B> {
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

impl<B: SmbusBus> SmbusBus for MeteredBus<B> {
    fn write_then_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), TransportError> {
        self.metrics.transactions.inc();
        match self.inner.write_then_read(address, write, read) {
            Ok(()) => {
                self.metrics.bytes_read.inc_by(read.len() as u64);
                Ok(())
            }
            Err(e) => {
                self.metrics.transport_errors.inc();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_all, RegisterSchema};
    use smbus_transport::MockBus;

    #[test]
    fn test_counts_transactions_and_failures() {
        let hub = MetricsHub::new().unwrap();
        let schema = RegisterSchema::bq30z555();
        let mut inner = MockBus::with_gauge_defaults(schema.address);
        inner.fail_command(0x09, TransportError::Nack);
        let mut bus = hub.wrap(inner);

        let entries = decode_all(&mut bus, schema.address, &schema);
        hub.record_entries(&entries);
        hub.registers_loaded.set(schema.len() as i64);

        let calls = bus.inner().calls().len() as u64;
        assert_eq!(hub.bus.transactions.get(), calls);
        assert_eq!(hub.bus.transport_errors.get(), 1);
        assert_eq!(hub.decode_errors.get(), 1);

        let text = hub.encode_text();
        assert!(text.contains("gauge_smbus_transactions"));
        assert!(text.contains("gauge_registers_loaded 37"));
    }
}
