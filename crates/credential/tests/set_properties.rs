//! Property tests for credential set transformations

use keyward_credential::{CredentialDescriptor, CredentialSet, KeyCredentialType, KeyId};
use proptest::prelude::*;
use uuid::Uuid;

fn descriptor(id: u128) -> CredentialDescriptor {
    CredentialDescriptor::new(
        KeyId::from_uuid(Uuid::from_u128(id)),
        KeyCredentialType::AsymmetricX509Cert,
    )
}

fn set_of(ids: &[u128]) -> CredentialSet {
    ids.iter().copied().map(descriptor).collect()
}

proptest! {
    #[test]
    fn add_then_remove_restores_set(ids in prop::collection::vec(any::<u128>(), 0..20), fresh in any::<u128>()) {
        prop_assume!(!ids.contains(&fresh));
        let set = set_of(&ids);
        let key_id = KeyId::from_uuid(Uuid::from_u128(fresh));

        let added = set.with_added(descriptor(fresh)).unwrap();
        prop_assert_eq!(added.len(), set.len() + 1);
        prop_assert!(added.contains(&key_id));

        let removed = added.with_removed(&key_id);
        prop_assert_eq!(removed, set);
    }

    #[test]
    fn adding_present_key_always_fails(ids in prop::collection::vec(any::<u128>(), 1..20), pick in any::<prop::sample::Index>()) {
        let set = set_of(&ids);
        let existing = ids[pick.index(ids.len())];

        prop_assert!(set.with_added(descriptor(existing)).is_err());
    }

    #[test]
    fn removal_keeps_every_other_key(ids in prop::collection::vec(any::<u128>(), 1..20), pick in any::<prop::sample::Index>()) {
        let set = set_of(&ids);
        let target = KeyId::from_uuid(Uuid::from_u128(ids[pick.index(ids.len())]));

        let removed = set.with_removed(&target);
        prop_assert!(!removed.contains(&target));
        prop_assert_eq!(removed.len(), set.len() - 1);
        for key_id in set.key_ids().filter(|key_id| *key_id != target) {
            prop_assert!(removed.contains(&key_id));
        }
    }

    #[test]
    fn removing_absent_key_is_identity(ids in prop::collection::vec(any::<u128>(), 0..20), absent in any::<u128>()) {
        prop_assume!(!ids.contains(&absent));
        let set = set_of(&ids);

        prop_assert_eq!(set.with_removed(&KeyId::from_uuid(Uuid::from_u128(absent))), set);
    }
}
