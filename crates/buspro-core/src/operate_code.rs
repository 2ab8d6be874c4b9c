//! Operate codes and device-type markers.
//!
//! Both are two-byte opaque values on the wire. The core only needs a handful
//! of them (the time broadcast, the controller marker); the rest are named
//! for diagnostics and for collaborators building requests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Two-byte message-type discriminator.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperateCode(pub u16);

impl OperateCode {
    pub const SCENE_CONTROL: Self = Self(0x0002);
    pub const SCENE_CONTROL_RESPONSE: Self = Self(0x0003);
    pub const SINGLE_CHANNEL_CONTROL: Self = Self(0x0031);
    pub const SINGLE_CHANNEL_CONTROL_RESPONSE: Self = Self(0x0032);
    pub const READ_STATUS_OF_CHANNELS: Self = Self(0x0033);
    pub const READ_STATUS_OF_CHANNELS_RESPONSE: Self = Self(0x0034);

    pub const ARM_SECURITY_MODULE: Self = Self(0x0104);
    pub const ARM_SECURITY_MODULE_RESPONSE: Self = Self(0x0105);
    pub const ALARM_SECURITY_MODULE: Self = Self(0x010C);
    pub const ALARM_SECURITY_MODULE_RESPONSE: Self = Self(0x010D);
    pub const READ_SECURITY_MODULE: Self = Self(0x011E);
    pub const READ_SECURITY_MODULE_RESPONSE: Self = Self(0x011F);

    pub const READ_DRY_CONTACT_STATUS: Self = Self(0x15CE);
    pub const READ_DRY_CONTACT_STATUS_RESPONSE: Self = Self(0x15CF);
    pub const BROADCAST_DRY_CONTACT_STATUS: Self = Self(0x15D1);

    pub const READ_SENSORS_IN_ONE_STATUS: Self = Self(0x1604);
    pub const READ_SENSORS_IN_ONE_STATUS_RESPONSE: Self = Self(0x1605);
    pub const BROADCAST_SENSORS_IN_ONE_STATUS: Self = Self(0x1630);
    pub const READ_12IN1_SENSOR_STATUS: Self = Self(0x1645);
    pub const READ_12IN1_SENSOR_STATUS_RESPONSE: Self = Self(0x1646);
    pub const BROADCAST_12IN1_SENSOR_STATUS: Self = Self(0x1647);

    pub const DLP_READ_FLOOR_HEATING_STATUS: Self = Self(0x1944);
    pub const DLP_READ_FLOOR_HEATING_STATUS_RESPONSE: Self = Self(0x1945);
    pub const DLP_CONTROL_FLOOR_HEATING_STATUS: Self = Self(0x1946);
    pub const DLP_CONTROL_FLOOR_HEATING_STATUS_RESPONSE: Self = Self(0x1947);
    pub const FHM_CONTROL_FLOOR_HEATING_STATUS: Self = Self(0x1C5C);
    pub const FHM_CONTROL_FLOOR_HEATING_STATUS_RESPONSE: Self = Self(0x1C5D);
    pub const FHM_READ_FLOOR_HEATING_STATUS: Self = Self(0x1C5E);
    pub const FHM_READ_FLOOR_HEATING_STATUS_RESPONSE: Self = Self(0x1C5F);

    pub const READ_POWER_FACTOR: Self = Self(0xD904);
    pub const READ_POWER_FACTOR_RESPONSE: Self = Self(0xD905);
    pub const READ_VOLTAGE: Self = Self(0xD902);
    pub const READ_VOLTAGE_RESPONSE: Self = Self(0xD903);
    pub const READ_CURRENT: Self = Self(0xD908);
    pub const READ_CURRENT_RESPONSE: Self = Self(0xD909);
    pub const READ_POWER: Self = Self(0xD90A);
    pub const READ_POWER_RESPONSE: Self = Self(0xD90B);
    pub const READ_ELECTRICITY: Self = Self(0xD91A);
    pub const READ_ELECTRICITY_RESPONSE: Self = Self(0xD91B);

    pub const MODIFY_SYSTEM_DATE_TIME: Self = Self(0xDA02);
    /// Periodic time sync heard by every device on the bus.
    pub const BROADCAST_SYSTEM_DATE_TIME: Self = Self(0xDA44);

    pub const BROADCAST_UNIVERSAL_SWITCH_STATUS: Self = Self(0xE017);
    pub const READ_UNIVERSAL_SWITCH_STATUS: Self = Self(0xE018);
    pub const READ_UNIVERSAL_SWITCH_STATUS_RESPONSE: Self = Self(0xE019);
    pub const UNIVERSAL_SWITCH_CONTROL: Self = Self(0xE01C);
    pub const UNIVERSAL_SWITCH_CONTROL_RESPONSE: Self = Self(0xE01D);

    pub const PANEL_CONTROL: Self = Self(0xE3D8);
    pub const PANEL_CONTROL_RESPONSE: Self = Self(0xE3D9);
    pub const READ_PANEL_STATUS: Self = Self(0xE3DA);
    pub const READ_PANEL_STATUS_RESPONSE: Self = Self(0xE3DB);
    pub const CURTAIN_SWITCH_CONTROL: Self = Self(0xE3E0);
    pub const CURTAIN_SWITCH_CONTROL_RESPONSE: Self = Self(0xE3E1);
    pub const READ_CURTAIN_SWITCH_STATUS: Self = Self(0xE3E2);
    pub const READ_CURTAIN_SWITCH_STATUS_RESPONSE: Self = Self(0xE3E3);
    pub const BROADCAST_TEMPERATURE: Self = Self(0xE3E5);
    pub const READ_TEMPERATURE_STATUS: Self = Self(0xE3E7);
    pub const READ_TEMPERATURE_STATUS_RESPONSE: Self = Self(0xE3E8);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub const fn from_be_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    /// True for the once-a-minute date/time broadcast.
    pub fn is_time_broadcast(self) -> bool {
        self == Self::BROADCAST_SYSTEM_DATE_TIME
    }

    /// Human-readable name for well-known codes.
    pub fn name(self) -> Option<&'static str> {
        let name = match self {
            Self::SCENE_CONTROL => "SceneControl",
            Self::SCENE_CONTROL_RESPONSE => "SceneControlResponse",
            Self::SINGLE_CHANNEL_CONTROL => "SingleChannelControl",
            Self::SINGLE_CHANNEL_CONTROL_RESPONSE => "SingleChannelControlResponse",
            Self::READ_STATUS_OF_CHANNELS => "ReadStatusOfChannels",
            Self::READ_STATUS_OF_CHANNELS_RESPONSE => "ReadStatusOfChannelsResponse",
            Self::ARM_SECURITY_MODULE => "ArmSecurityModule",
            Self::ARM_SECURITY_MODULE_RESPONSE => "ArmSecurityModuleResponse",
            Self::ALARM_SECURITY_MODULE => "AlarmSecurityModule",
            Self::ALARM_SECURITY_MODULE_RESPONSE => "AlarmSecurityModuleResponse",
            Self::READ_SECURITY_MODULE => "ReadSecurityModule",
            Self::READ_SECURITY_MODULE_RESPONSE => "ReadSecurityModuleResponse",
            Self::READ_DRY_CONTACT_STATUS => "ReadDryContactStatus",
            Self::READ_DRY_CONTACT_STATUS_RESPONSE => "ReadDryContactStatusResponse",
            Self::BROADCAST_DRY_CONTACT_STATUS => "BroadcastDryContactStatus",
            Self::READ_SENSORS_IN_ONE_STATUS => "ReadSensorsInOneStatus",
            Self::READ_SENSORS_IN_ONE_STATUS_RESPONSE => "ReadSensorsInOneStatusResponse",
            Self::BROADCAST_SENSORS_IN_ONE_STATUS => "BroadcastSensorsInOneStatus",
            Self::READ_12IN1_SENSOR_STATUS => "Read12in1SensorStatus",
            Self::READ_12IN1_SENSOR_STATUS_RESPONSE => "Read12in1SensorStatusResponse",
            Self::BROADCAST_12IN1_SENSOR_STATUS => "Broadcast12in1SensorStatus",
            Self::DLP_READ_FLOOR_HEATING_STATUS => "DlpReadFloorHeatingStatus",
            Self::DLP_READ_FLOOR_HEATING_STATUS_RESPONSE => "DlpReadFloorHeatingStatusResponse",
            Self::DLP_CONTROL_FLOOR_HEATING_STATUS => "DlpControlFloorHeatingStatus",
            Self::DLP_CONTROL_FLOOR_HEATING_STATUS_RESPONSE => {
                "DlpControlFloorHeatingStatusResponse"
            }
            Self::FHM_CONTROL_FLOOR_HEATING_STATUS => "FhmControlFloorHeatingStatus",
            Self::FHM_CONTROL_FLOOR_HEATING_STATUS_RESPONSE => {
                "FhmControlFloorHeatingStatusResponse"
            }
            Self::FHM_READ_FLOOR_HEATING_STATUS => "FhmReadFloorHeatingStatus",
            Self::FHM_READ_FLOOR_HEATING_STATUS_RESPONSE => "FhmReadFloorHeatingStatusResponse",
            Self::READ_POWER_FACTOR => "ReadPowerFactor",
            Self::READ_POWER_FACTOR_RESPONSE => "ReadPowerFactorResponse",
            Self::READ_VOLTAGE => "ReadVoltage",
            Self::READ_VOLTAGE_RESPONSE => "ReadVoltageResponse",
            Self::READ_CURRENT => "ReadCurrent",
            Self::READ_CURRENT_RESPONSE => "ReadCurrentResponse",
            Self::READ_POWER => "ReadPower",
            Self::READ_POWER_RESPONSE => "ReadPowerResponse",
            Self::READ_ELECTRICITY => "ReadElectricity",
            Self::READ_ELECTRICITY_RESPONSE => "ReadElectricityResponse",
            Self::MODIFY_SYSTEM_DATE_TIME => "ModifySystemDateTime",
            Self::BROADCAST_SYSTEM_DATE_TIME => "BroadcastSystemDateTime",
            Self::BROADCAST_UNIVERSAL_SWITCH_STATUS => "BroadcastUniversalSwitchStatus",
            Self::READ_UNIVERSAL_SWITCH_STATUS => "ReadUniversalSwitchStatus",
            Self::READ_UNIVERSAL_SWITCH_STATUS_RESPONSE => "ReadUniversalSwitchStatusResponse",
            Self::UNIVERSAL_SWITCH_CONTROL => "UniversalSwitchControl",
            Self::UNIVERSAL_SWITCH_CONTROL_RESPONSE => "UniversalSwitchControlResponse",
            Self::PANEL_CONTROL => "PanelControl",
            Self::PANEL_CONTROL_RESPONSE => "PanelControlResponse",
            Self::READ_PANEL_STATUS => "ReadPanelStatus",
            Self::READ_PANEL_STATUS_RESPONSE => "ReadPanelStatusResponse",
            Self::CURTAIN_SWITCH_CONTROL => "CurtainSwitchControl",
            Self::CURTAIN_SWITCH_CONTROL_RESPONSE => "CurtainSwitchControlResponse",
            Self::READ_CURTAIN_SWITCH_STATUS => "ReadCurtainSwitchStatus",
            Self::READ_CURTAIN_SWITCH_STATUS_RESPONSE => "ReadCurtainSwitchStatusResponse",
            Self::BROADCAST_TEMPERATURE => "BroadcastTemperature",
            Self::READ_TEMPERATURE_STATUS => "ReadTemperatureStatus",
            Self::READ_TEMPERATURE_STATUS_RESPONSE => "ReadTemperatureStatusResponse",
            _ => return None,
        };
        Some(name)
    }
}

impl From<u16> for OperateCode {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl fmt::Display for OperateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl fmt::Debug for OperateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({:#06x})", name, self.0),
            None => write!(f, "OperateCode({:#06x})", self.0),
        }
    }
}

/// Two-byte hardware model marker carried in every telegram.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceType(pub u16);

impl DeviceType {
    pub const NOT_SET: Self = Self(0x0000);
    /// Marker this controller stamps on everything it sends.
    pub const CONTROLLER: Self = Self(0xFFFC);
    pub const SETUP_TOOL: Self = Self(0xFFFE);

    pub const fn new(value: u16) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u16 {
        self.0
    }

    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }

    pub const fn from_be_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_be_bytes(bytes))
    }

    pub fn name(self) -> Option<&'static str> {
        let name = match self.0 {
            0x0000 => "NotSet",
            0x0011 => "SB-DN-6B0-10v",
            0x0077 => "SB-DRY-4Z",
            0x0086 => "SB-DLP2",
            0x0095 => "SB-DLP",
            0x009C => "SB-DLP-v2",
            0x012B => "SB-WS8M",
            0x0134 => "SB-CMS-12in1",
            0x0135 => "SB-CMS-8in1",
            0x0150 => "HDL-MSP07M",
            0x01AC => "SB-DN-R0816",
            0x0260 => "SB-DN-DT0601",
            0x026D => "HDL-MDT0601",
            0x0453 => "SB-DN-Logic960",
            0x0BE9 => "SB-DN-SEC250K",
            0xFFFC => "Controller",
            0xFFFD => "SmartHDLTest",
            0xFFFE => "SetupTool",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}({:#06x})", name, self.0),
            None => write!(f, "DeviceType({:#06x})", self.0),
        }
    }
}
