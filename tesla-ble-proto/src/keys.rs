//! `keys.proto`: key roles used when adding a key to the whitelist.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum Role {
    None = 0,
    Service = 1,
    Owner = 2,
    Driver = 3,
    FleetManager = 4,
    VehicleMonitor = 5,
    ChargingManager = 6,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_values_are_stable() {
        assert_eq!(Role::None as i32, 0);
        assert_eq!(Role::Driver as i32, 3);
        assert_eq!(Role::ChargingManager as i32, 6);
    }
}
