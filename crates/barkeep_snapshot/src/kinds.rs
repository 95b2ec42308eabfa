//! The canonical component list.
//!
//! Every snapshot record lists component presence in this order. The list
//! is the file and wire compatibility contract: new kinds go at the end,
//! existing entries are never reordered or removed.

use std::io::{Read, Write};

use barkeep_ecs::Entity;
use barkeep_game::components::{
    AiWaitInQueue, CanHoldFurniture, CanHoldItem, CanPathfind, HasDayNightTimer, HasName,
    HasWaitingQueue, IsAiControlled, IsBank, IsDrink, IsItem, IsSolid, IsSpawner,
    IsStoreSpawned, IsToilet, ModelRenderer, RespondsToDayNight, SimpleColoredBoxRenderer,
};
use barkeep_math::Transform;
use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::SnapshotError;

macro_rules! component_kinds {
    ($($kind:ident),+ $(,)?) => {
        /// A component type that can appear in a snapshot.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ComponentKind {
            $(
                #[doc = concat!("[`", stringify!($kind), "`].")]
                $kind,
            )+
        }

        impl ComponentKind {
            /// Every kind, in canonical order.
            pub const ALL: &'static [ComponentKind] = &[$(ComponentKind::$kind),+];

            /// The component's type name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(ComponentKind::$kind => stringify!($kind),)+
                }
            }

            /// Writes the presence byte and, if `entity` has the component,
            /// its payload.
            pub(crate) fn write(self, entity: &Entity, out: &mut impl Write) -> Result<(), SnapshotError> {
                match self {
                    $(
                        ComponentKind::$kind => match entity.try_get::<$kind>() {
                            Some(component) => {
                                out.write_u8(1)?;
                                rmp_serde::encode::write(out, component)?;
                            }
                            None => out.write_u8(0)?,
                        },
                    )+
                }
                Ok(())
            }

            /// Reads the presence byte and, if set, the payload, adding the
            /// component to `entity`.
            pub(crate) fn read(self, entity: &mut Entity, input: &mut impl Read) -> Result<(), SnapshotError> {
                if input.read_u8()? == 0 {
                    return Ok(());
                }
                match self {
                    $(
                        ComponentKind::$kind => {
                            let component: $kind = rmp_serde::from_read(&mut *input)?;
                            entity.add(component);
                        }
                    )+
                }
                Ok(())
            }
        }
    };
}

component_kinds! {
    Transform,
    HasName,
    IsItem,
    CanHoldItem,
    CanHoldFurniture,
    IsDrink,
    IsBank,
    IsSpawner,
    HasWaitingQueue,
    HasDayNightTimer,
    RespondsToDayNight,
    CanPathfind,
    IsAiControlled,
    AiWaitInQueue,
    IsSolid,
    IsStoreSpawned,
    IsToilet,
    SimpleColoredBoxRenderer,
    ModelRenderer,
}

/// Number of kinds this build knows.
#[must_use]
pub fn known_kinds() -> u16 {
    ComponentKind::ALL.len() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_is_stable() {
        // Appending is fine; changing any existing position breaks saves.
        assert_eq!(ComponentKind::ALL[0], ComponentKind::Transform);
        assert_eq!(ComponentKind::ALL[1], ComponentKind::HasName);
        assert_eq!(ComponentKind::ALL[2], ComponentKind::IsItem);
        assert_eq!(ComponentKind::ALL[3], ComponentKind::CanHoldItem);
        assert_eq!(ComponentKind::ALL[13], ComponentKind::AiWaitInQueue);
        assert_eq!(known_kinds(), 19);
    }

    #[test]
    fn test_absent_component_writes_single_zero() {
        let entity = Entity::new();
        let mut out = Vec::new();
        ComponentKind::HasName.write(&entity, &mut out).unwrap();
        assert_eq!(out, vec![0]);
    }

    #[test]
    fn test_read_adds_component() {
        let mut source = Entity::new();
        source.add(HasName::new("Test"));
        let mut out = Vec::new();
        ComponentKind::HasName.write(&source, &mut out).unwrap();

        let mut target = Entity::new();
        ComponentKind::HasName.read(&mut target, &mut out.as_slice()).unwrap();
        assert_eq!(target.get::<HasName>(), source.get::<HasName>());
    }
}
