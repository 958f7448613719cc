//! Built-in register table for the TI BQ30Z555 gas gauge.

use crate::{BitField, RegisterDescriptor, RegisterKind, RegisterSchema};
use smbus_transport::DEFAULT_GAUGE_ADDRESS;

/// Smart Battery command codes.
pub mod commands {
    pub const MANUFACTURER_ACCESS: u8 = 0x00;
    pub const REMAINING_CAPACITY_ALARM: u8 = 0x01;
    pub const REMAINING_TIME_ALARM: u8 = 0x02;
    pub const BATTERY_MODE: u8 = 0x03;
    pub const AT_RATE: u8 = 0x04;
    pub const TEMPERATURE: u8 = 0x08;
    pub const VOLTAGE: u8 = 0x09;
    pub const CURRENT: u8 = 0x0A;
    pub const AVERAGE_CURRENT: u8 = 0x0B;
    pub const MAX_ERROR: u8 = 0x0C;
    pub const RELATIVE_STATE_OF_CHARGE: u8 = 0x0D;
    pub const ABSOLUTE_STATE_OF_CHARGE: u8 = 0x0E;
    pub const REMAINING_CAPACITY: u8 = 0x0F;
    pub const FULL_CHARGE_CAPACITY: u8 = 0x10;
    pub const RUN_TIME_TO_EMPTY: u8 = 0x11;
    pub const AVERAGE_TIME_TO_EMPTY: u8 = 0x12;
    pub const AVERAGE_TIME_TO_FULL: u8 = 0x13;
    pub const CHARGING_CURRENT: u8 = 0x14;
    pub const CHARGING_VOLTAGE: u8 = 0x15;
    pub const BATTERY_STATUS: u8 = 0x16;
    pub const CYCLE_COUNT: u8 = 0x17;
    pub const DESIGN_CAPACITY: u8 = 0x18;
    pub const DESIGN_VOLTAGE: u8 = 0x19;
    pub const SPECIFICATION_INFO: u8 = 0x1A;
    pub const MANUFACTURER_DATE: u8 = 0x1B;
    pub const SERIAL_NUMBER: u8 = 0x1C;
    pub const MANUFACTURER_NAME: u8 = 0x20;
    pub const DEVICE_NAME: u8 = 0x21;
    pub const DEVICE_CHEMISTRY: u8 = 0x22;
    pub const MANUFACTURER_DATA: u8 = 0x23;
    pub const AUTHENTICATE: u8 = 0x2F;
    // Cell 4 sits at the lowest code.
    pub const CELL_VOLTAGE4: u8 = 0x3C;
    pub const CELL_VOLTAGE3: u8 = 0x3D;
    pub const CELL_VOLTAGE2: u8 = 0x3E;
    pub const CELL_VOLTAGE1: u8 = 0x3F;
    pub const STATE_OF_HEALTH: u8 = 0x4F;
    pub const SAFETY_ALERT: u8 = 0x50;
    pub const SAFETY_STATUS: u8 = 0x51;
    pub const PF_ALERT: u8 = 0x52;
    pub const PF_STATUS: u8 = 0x53;
    pub const OPERATION_STATUS: u8 = 0x54;
    pub const CHARGING_STATUS: u8 = 0x55;
    pub const GAUGING_STATUS: u8 = 0x56;
    pub const MANUFACTURING_STATUS: u8 = 0x57;
    pub const AFE_REGISTERS: u8 = 0x58;
    pub const MIN_SYS_V: u8 = 0x5D;
    pub const TURBO_CURRENT: u8 = 0x5E;
    pub const LIFETIME_DATA1: u8 = 0x60;
    pub const LIFETIME_DATA2: u8 = 0x61;
    pub const LIFETIME_DATA3: u8 = 0x62;
    pub const MANUFACTURER_INFO: u8 = 0x70;
}

use commands::*;

fn flags(labels: &[(&str, &str)]) -> Vec<BitField> {
    labels
        .iter()
        .enumerate()
        .map(|(bit, (short, long))| BitField::flag(bit as u16, short, long))
        .collect()
}

fn battery_status() -> Vec<BitField> {
    vec![
        BitField::new(
            0,
            4,
            "EC",
            "Error Code (0 OK, 1 Busy, 2 reserved cmd, 3 unsupported cmd, 4 access denied, 5 over/underflow, 6 bad size, 7 unknown)",
        ),
        BitField::flag(4, "FD", "Fully Discharged"),
        BitField::flag(5, "FC", "Fully Charged"),
        BitField::flag(6, "DSG", "Discharging"),
        BitField::flag(7, "INIT", "Initialization Active"),
        BitField::flag(8, "RTA", "Remaining Time Alarm"),
        BitField::flag(9, "RCA", "Remaining Capacity Alarm"),
        BitField::flag(10, "RSVD", "Reserved"),
        BitField::flag(11, "TDA", "Terminate Discharge Alarm"),
        BitField::flag(12, "OTA", "Overtemperature Alarm"),
        BitField::flag(13, "RSVD", "Reserved"),
        BitField::flag(14, "TCA", "Terminate Charge Alarm"),
        BitField::flag(15, "OCA", "Overcharged Alarm"),
    ]
}

fn safety_alert() -> Vec<BitField> {
    flags(&[
        ("OCC", "Over-Charge Current"),
        ("OCD", "Over-Discharge Current"),
        ("COV", "Cell Over-Voltage"),
        ("CUV", "Cell Under-Voltage"),
        ("OTC", "Over-Temp Charge"),
        ("OTD", "Over-Temp Discharge"),
        ("SCD", "Short-Circuit Discharge"),
        ("OLD", "Overload Protection"),
        ("RSVD", "Reserved 8"),
        ("RSVD", "Reserved 9"),
        ("RSVD", "Reserved 10"),
        ("RSVD", "Reserved 11"),
        ("RSVD", "Reserved 12"),
        ("PF", "Permanent Fail"),
        ("SLEEP", "Sleep"),
        ("RSVD", "Reserved 15"),
    ])
}

fn safety_status() -> Vec<BitField> {
    flags(&[
        ("CUV", "Cell Undervoltage"),
        ("COV", "Cell Overvoltage"),
        ("OCC1", "Overcurrent in Charge 1st Tier"),
        ("OCC2", "Overcurrent in Charge 2nd Tier"),
        ("OCD1", "Overcurrent in Discharge 1st Tier"),
        ("OCD2", "Overcurrent in Discharge 2nd Tier"),
        ("OLD", "Overload in Discharge"),
        ("OLDL", "Overload in Discharge Latch"),
        ("SCC", "Short Circuit in Charge"),
        ("SCCL", "Short Circuit in Charge Latch"),
        ("SCD", "Short Circuit in Discharge"),
        ("SCDL", "Short Circuit in Discharge Latch"),
        ("OTC", "Overtemperature in Charge"),
        ("OTD", "Overtemperature in Discharge"),
        ("CUVC", "I*R Compensated CUV"),
        ("RSVD", "Reserved"),
        ("OTF", "FET Overtemperature"),
        ("HWD", "SBS Host Watchdog Timeout"),
        ("PTO", "Precharging Timeout"),
        ("RSVD", "Reserved"),
        ("CTO", "Charging Timeout"),
        ("RSVD", "Reserved"),
        ("OC", "Overcharge"),
        ("CHGC", "Charging Current Higher Than Requested"),
        ("CHGV", "Charging Voltage Higher Than Requested"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
    ])
}

// PFAlert and PFStatus share one layout.
fn permanent_failure() -> Vec<BitField> {
    flags(&[
        ("CUV", "CUV Latched"),
        ("COV", "COV Latched"),
        ("CUDEP", "Copper Deposition"),
        ("RSVD", "Reserved"),
        ("OTCE", "Overtemperature"),
        ("RSVD", "Reserved"),
        ("OTF", "Overtemperature FET"),
        ("QIM", "QMAX Imbalance"),
        ("CB", "Cell Balancing"),
        ("IMP", "Cell Impedance"),
        ("CD", "Capacity Deterioration"),
        ("VIMR", "Voltage Imbalance at Rest"),
        ("VIMA", "Voltage Imbalance Active"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("CFETF", "Charge FET"),
        ("DFETF", "Discharge FET"),
        ("THERM", "Thermistor"),
        ("FUSE", "Fuse"),
        ("AFER", "AFE Register"),
        ("AFEC", "AFE Communication"),
        ("2LVL", "Fuse Triggered by External 2nd Level Protection"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("OCECO", "Open VCx"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
    ])
}

fn operation_status() -> Vec<BitField> {
    flags(&[
        ("PRES", "PRES Input (active = low detected)"),
        ("DSG", "Discharge FET Enabled"),
        ("CHG", "Charge FET Enabled"),
        ("PCHG", "Precharge FET Enabled"),
        ("GPOD", "GPOD FET Enabled"),
        ("FUSE", "Fuse Input High"),
        ("CB", "Cell Balancing Active"),
        ("RSVD", "Reserved"),
        ("SEC0", "Security Mode Bit 0"),
        ("SEC1", "Security Mode Bit 1"),
        ("CAL", "Calibration Mode Active"),
        ("SS", "SafetyStatus Active"),
        ("PF", "Permanent Failure Active"),
        ("XDSG", "Discharging Disabled"),
        ("XCHG", "Charging Disabled"),
        ("SLEEP", "Sleep Condition Met"),
        ("SDM", "Shutdown via ManufacturerAccess"),
        ("RSVD", "Reserved"),
        ("AUTH", "Authentication Ongoing"),
        ("AWD", "AFE Watchdog Failure"),
        ("FVS", "Fast Voltage Sampling"),
        ("CALO", "Raw ADC/CC Offset Active"),
        ("SDV", "Shutdown via Voltage"),
        ("SLEEPM", "Sleep via ManufacturerAccess"),
        ("INIT", "Initialization after Full Reset"),
        ("SMBLCAL", "CC Auto Offset Calibration"),
        ("SLEEPQMAX", "QMAX Update in Sleep"),
        ("SLEEPC", "Current Check in Sleep"),
        ("XLSBS", "Fast SBS Mode"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
    ])
}

fn charging_status() -> Vec<BitField> {
    flags(&[
        ("UT", "Under Temperature"),
        ("LT", "Low Temperature"),
        ("STL", "Standard Low Temperature"),
        ("RT", "Recommended Temperature"),
        ("ST", "Standard High Temperature"),
        ("HT", "High Temperature"),
        ("OT", "Over Temperature"),
        ("PV", "Precharge Voltage"),
        ("LV", "Low Voltage Range"),
        ("MV", "Mid Voltage Range"),
        ("HV", "High Voltage Range"),
        ("IN", "Charge Inhibit"),
        ("SU", "Charge Suspend"),
        ("CCR", "Charging Current Rate"),
        ("CVR", "Charging Voltage Rate"),
        ("CCC", "Charging Current Compensation"),
    ])
}

fn gauging_status() -> Vec<BitField> {
    flags(&[
        ("RESTDOD0", "OCV/QMAX Updated"),
        ("DSG", "Discharging Detected"),
        ("RU", "Resistance Update Enabled"),
        ("VOK", "Voltage OK for QMAX"),
        ("QEN", "QMAX Updates Enabled"),
        ("FD", "Fully Discharged Detected"),
        ("FC", "Fully Charged Detected"),
        ("NSFM", "Negative Scale Factor Mode"),
        ("VDQ", "Qualified Discharge"),
        ("QMAX", "QMAX Updated"),
        ("RX", "Resistance Updated"),
        ("LDMD", "Load Mode (0 = CC, 1 = CP)"),
        ("OCVFR", "OCV in Flat Region"),
        ("TDA", "Terminate Discharge Alarm"),
        ("TCA", "Terminate Charge Alarm"),
        ("LPF", "LiPh Relax"),
    ])
}

fn manufacturing_status() -> Vec<BitField> {
    flags(&[
        ("PCHG", "Precharge FET"),
        ("CHG", "Charge FET"),
        ("DSG", "Discharge FET"),
        ("GAUGE", "Gauging"),
        ("FET", "FET Action"),
        ("LF", "Lifetime Data"),
        ("PF", "Permanent Fail"),
        ("BBR", "Black Box Recorder"),
        ("FUSE", "Fuse Action"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("RSVD", "Reserved"),
        ("CAL", "Calibration Mode ADC/CC"),
    ])
}

fn ascii(command: u8, name: &str) -> RegisterDescriptor {
    RegisterDescriptor::new(command, name, "", RegisterKind::BlockAscii)
}

fn millivolts(command: u8, name: &str) -> RegisterDescriptor {
    RegisterDescriptor::word_float(command, name, "V", 0.001, 0.0)
}

fn milliamps(command: u8, name: &str) -> RegisterDescriptor {
    RegisterDescriptor::word_float(command, name, "A", 0.001, 0.0)
}

impl RegisterSchema {
    /// The BQ30Z555 command set in display order.
    pub fn bq30z555() -> Self {
        let registers = vec![
            RegisterDescriptor::word_integer(SERIAL_NUMBER, "SerialNumber", ""),
            ascii(MANUFACTURER_NAME, "ManufacturerName"),
            ascii(DEVICE_NAME, "DeviceName"),
            ascii(DEVICE_CHEMISTRY, "DeviceChemistry"),
            ascii(MANUFACTURER_DATA, "ManufacturerData"),
            RegisterDescriptor::new(MANUFACTURER_DATE, "ManufacturerDate", "", RegisterKind::WordHex),
            millivolts(VOLTAGE, "Voltage"),
            // 0.1 K to degrees Celsius
            RegisterDescriptor::word_float(TEMPERATURE, "Temperature", "°C", 0.1, -273.15),
            milliamps(CURRENT, "Current"),
            millivolts(CELL_VOLTAGE1, "Cell1Voltage"),
            millivolts(CELL_VOLTAGE2, "Cell2Voltage"),
            millivolts(CELL_VOLTAGE3, "Cell3Voltage"),
            millivolts(CELL_VOLTAGE4, "Cell4Voltage"),
            RegisterDescriptor::word_integer(CYCLE_COUNT, "CycleCount", "cycles"),
            millivolts(CHARGING_VOLTAGE, "ChargingVoltage"),
            millivolts(DESIGN_VOLTAGE, "DesignVoltage"),
            millivolts(MIN_SYS_V, "MinSystemVoltage"),
            milliamps(AVERAGE_CURRENT, "AverageCurrent"),
            milliamps(CHARGING_CURRENT, "ChargingCurrent"),
            milliamps(TURBO_CURRENT, "TurboCurrent"),
            RegisterDescriptor::word_integer(RELATIVE_STATE_OF_CHARGE, "RelativeSoC", "%"),
            RegisterDescriptor::word_integer(ABSOLUTE_STATE_OF_CHARGE, "AbsoluteSoC", "%"),
            RegisterDescriptor::word_integer(REMAINING_CAPACITY, "RemainingCapacity", "mAh"),
            RegisterDescriptor::word_integer(FULL_CHARGE_CAPACITY, "FullChargeCapacity", "mAh"),
            RegisterDescriptor::word_integer(DESIGN_CAPACITY, "DesignCapacity", "mAh"),
            RegisterDescriptor::word_integer(RUN_TIME_TO_EMPTY, "RunTimeToEmpty", "min"),
            RegisterDescriptor::word_integer(AVERAGE_TIME_TO_EMPTY, "AvgTimeToEmpty", "min"),
            RegisterDescriptor::word_integer(AVERAGE_TIME_TO_FULL, "AvgTimeToFull", "min"),
            RegisterDescriptor::bits(BATTERY_STATUS, "BatteryStatus", battery_status()),
            RegisterDescriptor::bits(SAFETY_ALERT, "SafetyAlert", safety_alert()),
            RegisterDescriptor::bits(SAFETY_STATUS, "SafetyStatus", safety_status()),
            RegisterDescriptor::bits(PF_ALERT, "PFAlert", permanent_failure()),
            RegisterDescriptor::bits(PF_STATUS, "PFStatus", permanent_failure()),
            RegisterDescriptor::bits(OPERATION_STATUS, "OperationStatus", operation_status()),
            RegisterDescriptor::bits(CHARGING_STATUS, "ChargingStatus", charging_status()),
            RegisterDescriptor::bits(GAUGING_STATUS, "GaugingStatus", gauging_status()),
            RegisterDescriptor::bits(
                MANUFACTURING_STATUS,
                "ManufacturingStatus",
                manufacturing_status(),
            ),
        ];
        RegisterSchema::new("bq30z555", DEFAULT_GAUGE_ADDRESS, registers)
    }
}
