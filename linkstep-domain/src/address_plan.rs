use linkstep_types::{BuildTarget, LoadAddress};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address step must be non-zero")]
    ZeroStep,

    #[error("address for ordinal {ordinal} overflows: {base} + {step} * {ordinal}")]
    Overflow {
        base: LoadAddress,
        step: LoadAddress,
        ordinal: u64,
    },
}

/// Maps a target's ordinal to its load address: `base + step * ordinal`.
///
/// Holds no state beyond the two constants, so addresses depend only on position
/// and never on how many builds actually ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressPlan {
    base: LoadAddress,
    step: LoadAddress,
}

impl AddressPlan {
    pub fn new(base: LoadAddress, step: LoadAddress) -> Result<Self, AddressError> {
        if step.get() == 0 {
            return Err(AddressError::ZeroStep);
        }
        Ok(Self { base, step })
    }

    pub fn base(&self) -> LoadAddress {
        self.base
    }

    pub fn step(&self) -> LoadAddress {
        self.step
    }

    /// The literal the linker configuration is expected to contain.
    pub fn canonical_token(&self) -> String {
        self.base.to_string()
    }

    pub fn address_for(&self, ordinal: u64) -> Result<LoadAddress, AddressError> {
        self.step
            .get()
            .checked_mul(ordinal)
            .and_then(|offset| self.base.get().checked_add(offset))
            .map(LoadAddress::new)
            .ok_or(AddressError::Overflow {
                base: self.base,
                step: self.step,
                ordinal,
            })
    }

    pub fn address_of(&self, target: &BuildTarget) -> Result<LoadAddress, AddressError> {
        self.address_for(target.ordinal)
    }

    /// Assign addresses to every target up front; fails on the first overflow.
    pub fn assign<'a>(
        &self,
        targets: &'a [BuildTarget],
    ) -> Result<Vec<(&'a BuildTarget, LoadAddress)>, AddressError> {
        targets
            .iter()
            .map(|t| self.address_of(t).map(|addr| (t, addr)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> AddressPlan {
        AddressPlan::new(LoadAddress::new(0x8040_0000), LoadAddress::new(0x20000)).unwrap()
    }

    #[test]
    fn assigns_base_plus_step_times_ordinal() {
        let p = plan();
        assert_eq!(p.address_for(0).unwrap().to_string(), "0x80400000");
        assert_eq!(p.address_for(1).unwrap().to_string(), "0x80420000");
        assert_eq!(p.address_for(2).unwrap().to_string(), "0x80440000");
    }

    #[test]
    fn canonical_token_is_base_hex() {
        assert_eq!(plan().canonical_token(), "0x80400000");
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = AddressPlan::new(LoadAddress::new(0x1000), LoadAddress::new(0)).unwrap_err();
        assert_eq!(err, AddressError::ZeroStep);
    }

    #[test]
    fn overflow_is_an_error_not_a_wrap() {
        let p = AddressPlan::new(LoadAddress::new(u64::MAX - 1), LoadAddress::new(1)).unwrap();
        assert!(p.address_for(1).is_ok());
        let err = p.address_for(2).unwrap_err();
        assert!(matches!(err, AddressError::Overflow { ordinal: 2, .. }));

        let p = AddressPlan::new(LoadAddress::new(0), LoadAddress::new(u64::MAX)).unwrap();
        assert!(p.address_for(2).is_err());
    }

    #[test]
    fn assign_pairs_targets_with_addresses() {
        let targets = vec![BuildTarget::new("alpha", 0), BuildTarget::new("beta", 1)];
        let assigned = plan().assign(&targets).unwrap();
        assert_eq!(assigned[0].0.name, "alpha");
        assert_eq!(assigned[1].1.to_string(), "0x80420000");
    }
}
