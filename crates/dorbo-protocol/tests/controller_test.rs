//! Integration tests running the controller against a simulated device.

use dorbo_protocol::mock::SimulatedDevice;
use dorbo_protocol::{
    ConnectionState, Controller, ControllerBuilder, ControllerConfig, ControllerError, Credential,
};

fn connect(device: &mut SimulatedDevice) -> Controller<&mut SimulatedDevice> {
    ControllerBuilder::new(device)
        .connect()
        .expect("handshake with simulated device should succeed")
}

// ============================================================================
// Credential Round Trips
// ============================================================================

#[test]
fn test_set_then_get_round_trip() {
    let mut device = SimulatedDevice::new();
    let mut controller = connect(&mut device);

    let samples = [
        Credential::new(0, 0),
        Credential::new(44, 12312),
        Credential::new(103, 26441),
        Credential::new(255, 65535),
        Credential::new(1, 65535),
        Credential::new(255, 0),
    ];
    for (index, credential) in samples.iter().enumerate() {
        controller.set_wiegand26(index as u8, *credential).unwrap();
    }
    for (index, credential) in samples.iter().enumerate() {
        assert_eq!(controller.get_wiegand26(index as u8).unwrap(), *credential);
    }
}

#[test]
fn test_full_value_range_round_trip() {
    let mut device = SimulatedDevice::with_capacity(256);
    let mut controller = connect(&mut device);

    // Every facility, paired with users 0, 257, ..., 65535 in both directions.
    fn ascending(index: u8) -> Credential {
        Credential::new(index, u16::from(index) * 257)
    }
    fn descending(index: u8) -> Credential {
        Credential::new(index, u16::MAX - u16::from(index) * 257)
    }

    for pairing in [ascending as fn(u8) -> Credential, descending] {
        for index in 0..=u8::MAX {
            controller.set_wiegand26(index, pairing(index)).unwrap();
        }
        let expected: Vec<Credential> = (0..=u8::MAX).map(pairing).collect();
        assert_eq!(controller.list_wiegand26().unwrap(), expected);
    }

    assert_eq!(controller.get_wiegand26(0).unwrap(), Credential::new(0, 65535));
    assert_eq!(controller.get_wiegand26(255).unwrap(), Credential::new(255, 0));
}

#[test]
fn test_set_then_list_round_trip() {
    let mut device = SimulatedDevice::with_capacity(4);
    {
        let mut controller = connect(&mut device);
        controller.set_wiegand26(1, Credential::new(44, 12312)).unwrap();
        controller.set_wiegand26(3, Credential::new(255, 65535)).unwrap();

        let credentials = controller.list_wiegand26().unwrap();
        assert_eq!(
            credentials,
            vec![
                Credential::EMPTY,
                Credential::new(44, 12312),
                Credential::EMPTY,
                Credential::new(255, 65535),
            ]
        );
    }
    assert!(device.is_closed());
}

#[test]
fn test_clear_resets_every_slot() {
    let mut device = SimulatedDevice::with_capacity(5);
    device.store(0, Credential::new(9, 9));
    device.store(4, Credential::new(8, 8));

    let mut controller = connect(&mut device);
    controller.clear_wiegand26().unwrap();

    let credentials = controller.list_wiegand26().unwrap();
    assert_eq!(credentials.len(), 5);
    assert!(credentials.iter().all(Credential::is_empty));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_index_past_capacity_is_command_failure() {
    let mut device = SimulatedDevice::new();
    let mut controller = connect(&mut device);

    match controller.get_wiegand26(200).unwrap_err() {
        ControllerError::CommandFailure { command, lines } => {
            assert_eq!(command, "r w26 200");
            assert_eq!(lines, vec!["index too large".to_string()]);
        }
        other => panic!("expected CommandFailure, got {:?}", other),
    }

    // The failure does not affect later commands.
    controller.set_wiegand26(0, Credential::new(1, 2)).unwrap();
    assert_eq!(controller.get_wiegand26(0).unwrap(), Credential::new(1, 2));
}

#[test]
fn test_invalid_door_is_command_failure() {
    let mut device = SimulatedDevice::new();
    {
        let mut controller = connect(&mut device);
        assert!(matches!(
            controller.open_door(7),
            Err(ControllerError::CommandFailure { .. })
        ));
        controller.open_door(0).unwrap();
    }
    assert_eq!(device.opened_doors(), &[0]);
}

#[test]
fn test_open_missing_port_is_connection_error() {
    let config = ControllerConfig::new("/dev/dorbo-does-not-exist");
    let err = Controller::open(&config).err().expect("opening a missing port should fail");
    assert!(matches!(err, ControllerError::Connection { .. }));
}

#[test]
fn test_open_without_port_is_config_error() {
    let err = Controller::open(&ControllerConfig::default()).err().unwrap();
    assert!(matches!(err, ControllerError::InvalidConfig(_)));
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_stale_output_is_discarded() {
    let mut device = SimulatedDevice::new()
        .with_stale_output("w w26 1 2")
        .with_stale_output("err");
    device.store(2, Credential::new(44, 12312));

    let mut controller = connect(&mut device);
    assert_eq!(controller.state(), ConnectionState::Ready);
    assert_eq!(controller.get_wiegand26(2).unwrap(), Credential::new(44, 12312));
}

#[test]
fn test_storage_info() {
    let mut device = SimulatedDevice::with_capacity(64);
    let mut controller = connect(&mut device);
    assert_eq!(controller.storage_info().unwrap().w26_capacity, 64);
}

#[test]
fn test_commands_sent_in_order() {
    let mut device = SimulatedDevice::new();
    {
        let mut controller = connect(&mut device);
        controller.set_wiegand26(7, Credential::new(44, 12312)).unwrap();
        controller.get_wiegand26(7).unwrap();
        controller.clear_wiegand26().unwrap();
        controller.close();
        assert!(matches!(
            controller.list_wiegand26(),
            Err(ControllerError::NotConnected)
        ));
    }
    assert_eq!(
        device.commands(),
        &["", "w w26 7 44 12312", "r w26 7", "x w26"]
    );
}
