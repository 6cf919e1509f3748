//! Layouts of the PON terminal's status and traffic statistics pages.

use super::{ExtractError, Field, FieldTable};

/// Live status page: values sit in `<font>` elements, every other one a label.
pub const STATUS_TABLE: FieldTable<5> = FieldTable {
    tag: "font",
    fields: [
        Field { index: 4, name: "pon_temperature", help: "temperature of the SFP ONT" },
        Field { index: 6, name: "pon_voltage", help: "Voltage of the SFP ONT" },
        Field { index: 8, name: "pon_tx_power", help: "SFP ONT TX Power" },
        Field { index: 10, name: "pon_rx_power", help: "SFP ONT RX Power" },
        Field { index: 12, name: "pon_bias_current", help: "SFP ONT Bias Current" },
    ],
};

/// Traffic statistics page: one counter per `<td>`, after the header cell.
pub const COUNTERS_TABLE: FieldTable<15> = FieldTable {
    tag: "td",
    fields: [
        Field { index: 1, name: "pon_sent_bytes", help: "Bytes sent over PON network" },
        Field { index: 2, name: "pon_receieved_bytes", help: "Bytes received over PON network" },
        Field { index: 3, name: "pon_sent_packets", help: "Packetes sent over PON network" },
        Field { index: 4, name: "pon_receieved_packets", help: "Packets received over PON network" },
        Field {
            index: 5,
            name: "pon_sent_unicast_packets",
            help: "Unicast packets sent over PON network",
        },
        Field {
            index: 6,
            name: "pon_received_unicast_packets",
            help: "Unicast packets received over PON network",
        },
        Field {
            index: 7,
            name: "pon_sent_multicast_packets",
            help: "Mutlicast packets sent over PON network",
        },
        Field {
            index: 8,
            name: "pon_received_multicast_packets",
            help: "Mutlicast packets received over PON network",
        },
        Field {
            index: 9,
            name: "pon_sent_broadcast_packets",
            help: "Broadcast packets sent over PON network",
        },
        Field {
            index: 10,
            name: "pon_received_broadcast_packets",
            help: "Broadcast packets Received over PON network",
        },
        Field { index: 11, name: "pon_fec_errors", help: "FEC errors on the pon network" },
        Field { index: 12, name: "pon_hec_errors", help: "HEC errors on the pon network" },
        Field { index: 13, name: "pon_packets_dropped", help: "Packets dropped on the pon network" },
        Field {
            index: 14,
            name: "pon_pause_packets_sent",
            help: "Pause packets sent on the pon network",
        },
        Field {
            index: 15,
            name: "pon_pause_packets_received",
            help: "Pause packets received on the pon network",
        },
    ],
};

/// Optical module health read from the status page.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceStatusSample {
    pub temperature: f64,
    pub voltage: f64,
    pub tx_power: f64,
    pub rx_power: f64,
    pub bias_current: f64,
}

impl DeviceStatusSample {
    /// Build from values in [`STATUS_TABLE`] order.
    pub fn from_values(v: [f64; 5]) -> Self {
        Self {
            temperature: v[0],
            voltage: v[1],
            tx_power: v[2],
            rx_power: v[3],
            bias_current: v[4],
        }
    }

    /// Values in [`STATUS_TABLE`] order.
    pub fn values(&self) -> [f64; 5] {
        [
            self.temperature,
            self.voltage,
            self.tx_power,
            self.rx_power,
            self.bias_current,
        ]
    }
}

/// Traffic counters read from the statistics page.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DeviceCounterSample {
    pub sent_bytes: f64,
    pub received_bytes: f64,
    pub sent_packets: f64,
    pub received_packets: f64,
    pub sent_unicast_packets: f64,
    pub received_unicast_packets: f64,
    pub sent_multicast_packets: f64,
    pub received_multicast_packets: f64,
    pub sent_broadcast_packets: f64,
    pub received_broadcast_packets: f64,
    pub fec_errors: f64,
    pub hec_errors: f64,
    pub packets_dropped: f64,
    pub pause_packets_sent: f64,
    pub pause_packets_received: f64,
}

impl DeviceCounterSample {
    /// Build from values in [`COUNTERS_TABLE`] order.
    pub fn from_values(v: [f64; 15]) -> Self {
        Self {
            sent_bytes: v[0],
            received_bytes: v[1],
            sent_packets: v[2],
            received_packets: v[3],
            sent_unicast_packets: v[4],
            received_unicast_packets: v[5],
            sent_multicast_packets: v[6],
            received_multicast_packets: v[7],
            sent_broadcast_packets: v[8],
            received_broadcast_packets: v[9],
            fec_errors: v[10],
            hec_errors: v[11],
            packets_dropped: v[12],
            pause_packets_sent: v[13],
            pause_packets_received: v[14],
        }
    }

    /// Values in [`COUNTERS_TABLE`] order.
    pub fn values(&self) -> [f64; 15] {
        [
            self.sent_bytes,
            self.received_bytes,
            self.sent_packets,
            self.received_packets,
            self.sent_unicast_packets,
            self.received_unicast_packets,
            self.sent_multicast_packets,
            self.received_multicast_packets,
            self.sent_broadcast_packets,
            self.received_broadcast_packets,
            self.fec_errors,
            self.hec_errors,
            self.packets_dropped,
            self.pause_packets_sent,
            self.pause_packets_received,
        ]
    }
}

/// Extract the optical status fields from the live status page.
pub fn extract_status(html: &str) -> Result<DeviceStatusSample, ExtractError> {
    STATUS_TABLE.extract(html).map(DeviceStatusSample::from_values)
}

/// Extract the fifteen traffic counters from the statistics page.
pub fn extract_counters(html: &str) -> Result<DeviceCounterSample, ExtractError> {
    COUNTERS_TABLE.extract(html).map(DeviceCounterSample::from_values)
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Status page shaped like the terminal's `status_pon.asp`.
    pub fn status_page() -> String {
        let rows = [
            ("Temperature", "41.5 C"),
            ("Voltage", "3.3 V"),
            ("Tx Power", "2.1 dBm"),
            ("Rx Power", "-18.4 dBm"),
            ("Bias Current", "12.0 mA"),
        ];
        let mut html = String::from(
            "<html><body><font>PON Status</font>\
             <table><tr><td><font>Serial</font></td><td><font>ABC123</font></td></tr>",
        );
        for (label, value) in rows {
            html.push_str(&format!(
                "<tr><td><font>{}</font></td><td><font>{}</font></td></tr>",
                label, value
            ));
        }
        html.push_str("</table></body></html>");
        html
    }

    /// Statistics page shaped like the terminal's `pon-stats.asp`.
    pub fn counters_page() -> String {
        let mut html = String::from("<html><body><table><tr><td>PON Statistics</td></tr>");
        for i in 1..=15 {
            html.push_str(&format!("<tr><td>{}00 pkts</td></tr>", i));
        }
        html.push_str("</table></body></html>");
        html
    }
}
