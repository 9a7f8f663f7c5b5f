use thiserror::Error;

/// Display name. Windows device names are GUIDs, so the description is preferred there.
pub fn display_name(device: &pcap::Device) -> String {
    match (&device.desc, cfg!(target_os = "windows")) {
        (Some(desc), true) => desc.clone(),
        _ => device.name.clone(),
    }
}

/// Any device known to pcap, matched by name or description.
/// Monitor-mode interfaces usually carry no addresses and are found here too.
pub fn find_by_name(name: &str) -> Result<pcap::Device, InterfaceError> {
    let devices = pcap::Device::list().map_err(InterfaceError::PcapError)?;
    select_by_name(devices, name)
        .ok_or_else(|| InterfaceError::UnknownInterface(name.to_string()))
}

/// Fallback source when nothing is configured: the device with the most addresses.
pub fn first_usable() -> Result<pcap::Device, InterfaceError> {
    let devices = pcap::Device::list().map_err(InterfaceError::PcapError)?;
    most_addressed(devices).ok_or(InterfaceError::NoUsableInterface)
}

fn select_by_name(devices: Vec<pcap::Device>, name: &str) -> Option<pcap::Device> {
    devices
        .into_iter()
        .find(|device| device.name == name || device.desc.as_deref() == Some(name))
}

fn most_addressed(devices: Vec<pcap::Device>) -> Option<pcap::Device> {
    devices
        .into_iter()
        .filter(|device| !device.addresses.is_empty())
        .max_by_key(|device| device.addresses.len())
}

pub fn get_capture(
    device: pcap::Device, timeout: i32,
) -> Result<pcap::Capture<pcap::Active>, InterfaceError> {
    pcap::Capture::from_device(device)
        .map_err(InterfaceError::PcapError)?
        .snaplen(ppi::MAX_PACKET_LEN as i32)
        .promisc(true)
        .timeout(timeout)
        .immediate_mode(true)
        .open()
        .map_err(InterfaceError::PcapError)
}

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("Pcap Library error.")]
    PcapError(pcap::Error),

    #[error("There is no interface named '{0}'.")]
    UnknownInterface(String),

    #[error("There are no usable interfaces.")]
    NoUsableInterface,
}

impl InterfaceError {
    pub fn additional_info(&self) -> Option<String> {
        match self {
            InterfaceError::PcapError(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn device(name: &str, addresses: usize) -> pcap::Device {
        let mut device = pcap::Device::from(name);
        device.addresses = (0..addresses)
            .map(|index| pcap::Address {
                addr: IpAddr::V4(Ipv4Addr::new(10, 0, 0, index as u8 + 1)),
                netmask: None,
                broadcast_addr: None,
                dst_addr: None,
            })
            .collect();
        device
    }

    #[test]
    fn test_monitor_interface_without_addresses_is_found() {
        let devices = vec![device("eth0", 2), device("wlan0mon", 0)];

        let found = select_by_name(devices, "wlan0mon").unwrap();
        assert_eq!(found.name, "wlan0mon");
        assert!(found.addresses.is_empty());
    }

    #[test]
    fn test_unknown_name() {
        assert!(select_by_name(vec![device("eth0", 1)], "wlan1").is_none());
    }

    #[test]
    fn test_fallback_prefers_most_addresses() {
        let devices = vec![device("lo", 1), device("wlan0mon", 0), device("eth0", 3)];
        assert_eq!(most_addressed(devices).unwrap().name, "eth0");

        assert!(most_addressed(vec![device("wlan0mon", 0)]).is_none());
    }
}
