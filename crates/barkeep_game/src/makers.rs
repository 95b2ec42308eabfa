//! Entity makers.
//!
//! A maker turns a freshly created entity into a specific kind of thing by
//! setting its type and adding components. Makers never look at other
//! entities, so they work equally on entities from [`EntityStore::create`]
//! and on ones queued through [`Commands::spawn`](barkeep_ecs::Commands).

use barkeep_ecs::{Entity, EntityId, EntityStore, EntityType};
use barkeep_math::{FrontFaceDirection, Transform, Vec2, Vec3};

use crate::components::{
    AiAbilities, AiState, CanHoldFurniture, CanHoldItem, CanPathfind, Color, DayNightHook,
    HasDayNightTimer, HasName, HasWaitingQueue, HeldBy, IsAiControlled, IsBank, IsDrink, IsItem,
    IsSolid, IsSpawner, IsStoreSpawned, IsToilet, ModelRenderer, RespondsToDayNight,
    SimpleColoredBoxRenderer, SpawnKind,
};
use crate::config::GameConfig;

const WHITE: Color = [255, 255, 255, 255];
const GRAY: Color = [128, 128, 128, 255];
const BROWN: Color = [139, 69, 19, 255];
const BLUE: Color = [40, 80, 200, 255];
const RED: Color = [200, 40, 40, 255];

fn ground(pos: Vec2) -> Vec3 {
    Vec3::new(pos.x, 0.0, pos.y)
}

fn make_entity(entity: &mut Entity, entity_type: EntityType, pos: Vec2, face: Color, base: Color) {
    entity.entity_type = entity_type;
    entity.add(HasName::new(entity_type.name()));
    entity.add(Transform::from_position(ground(pos)));
    entity.add(SimpleColoredBoxRenderer::new(face, base));
}

fn make_solid(entity: &mut Entity, entity_type: EntityType, pos: Vec2, color: Color) {
    make_entity(entity, entity_type, pos, color, color);
    entity.add(IsSolid);
}

/// A customer that wanders until the bar opens.
pub fn make_customer(entity: &mut Entity, pos: Vec2) {
    make_entity(entity, EntityType::Customer, pos, RED, BLUE);
    entity.add(CanHoldItem::new(HeldBy::Customer));
    entity.add(
        IsAiControlled::new(AiState::Wander).with_ability(AiAbilities::USE_BATHROOM, true),
    );
    entity.add(CanPathfind::new(entity.id));
}

/// A loose item drawn with a model.
pub fn make_item(entity: &mut Entity, entity_type: EntityType, pos: Vec2) {
    entity.entity_type = entity_type;
    entity.add(Transform::new(ground(pos), Vec3::splat(0.5)));
    entity.add(IsItem::default());
    entity.add(ModelRenderer::new(entity_type.name().to_lowercase()));
}

/// An empty cup.
pub fn make_drink(entity: &mut Entity, pos: Vec2) {
    make_item(entity, EntityType::Drink, pos);
    entity.add(IsDrink::default());
}

/// Litter left behind by customers.
pub fn make_trash(entity: &mut Entity, pos: Vec2) {
    make_item(entity, EntityType::Trash, pos);
}

/// An item for sale in the store. Hidden from gameplay queries.
pub fn make_store_item(entity: &mut Entity, pos: Vec2) {
    make_item(entity, EntityType::StoreItem, pos);
    entity.get_mut::<IsItem>().allowed_holders = vec![HeldBy::Store, HeldBy::Player];
    entity.add(IsStoreSpawned);
}

/// A table items can be put on.
pub fn make_table(entity: &mut Entity, pos: Vec2) {
    make_solid(entity, EntityType::Table, pos, BROWN);
    entity.add(CanHoldItem::new(HeldBy::Furniture));
}

/// An impassable wall tile.
pub fn make_wall(entity: &mut Entity, pos: Vec2) {
    make_solid(entity, EntityType::Wall, pos, GRAY);
}

/// A door that opens while the bar is open and shuts during the day.
pub fn make_door(entity: &mut Entity, pos: Vec2) {
    make_solid(entity, EntityType::Door, pos, BROWN);
    let mut hooks = RespondsToDayNight::new(entity.id);
    hooks.on_night_started = Some(DayNightHook::OpenDoor);
    hooks.on_day_started = Some(DayNightHook::CloseDoor);
    entity.add(hooks);
}

/// A toilet.
pub fn make_toilet(entity: &mut Entity, pos: Vec2) {
    make_solid(entity, EntityType::Toilet, pos, WHITE);
    entity.add(IsToilet::default());
}

/// A register customers line up in front of.
pub fn make_register(entity: &mut Entity, pos: Vec2, facing: FrontFaceDirection) {
    make_solid(entity, EntityType::Register, pos, GRAY);
    entity.get_mut::<Transform>().facing = facing;
    entity.add(HasWaitingQueue::default());
    entity.add(CanHoldItem::new(HeldBy::Furniture));
}

/// A spawner producing the first night's customers.
pub fn make_customer_spawner(entity: &mut Entity, pos: Vec2, config: &GameConfig) {
    entity.entity_type = EntityType::CustomerSpawner;
    entity.add(Transform::from_position(ground(pos)));
    entity.add(
        IsSpawner::new(SpawnKind::Customer)
            .set_total(config.customers_for_day(0))
            .set_time_between(config.spawn_time_between)
            .enable_prevent_duplicates()
            .enable_show_progress(),
    );
}

/// Creates the permanent singleton holding the round timer and the bank.
pub fn make_sophie(store: &mut EntityStore, config: &GameConfig) -> EntityId {
    let entity = store.create_permanent();
    entity.entity_type = EntityType::Sophie;
    entity.add(HasName::new("Sophie"));
    entity.add(Transform::from_position(Vec3::ZERO));
    entity.add(
        HasDayNightTimer::new(config.day_length, config.night_length)
            .with_rent(config.rent_days, config.rent_initial),
    );
    entity.add(IsBank::with_balance(config.starting_balance));
    let mut hooks = RespondsToDayNight::new(entity.id);
    hooks.on_day_started = Some(DayNightHook::ResetCart);
    entity.add(hooks);
    entity.add(CanHoldFurniture::default());
    tracing::info!(entity = %entity.id, "created singleton");
    entity.id
}

/// Builds the default bar: the singleton, an enclosing room with a door on
/// the exit side, two registers, a table, a toilet and a customer spawner.
pub fn seed_world(store: &mut EntityStore, config: &GameConfig) {
    make_sophie(store, config);

    const HALF: i32 = 8;
    let door = Vec2::new(-HALF as f32, 0.0);
    for i in -HALF..=HALF {
        for pos in [
            Vec2::new(i as f32, -HALF as f32),
            Vec2::new(i as f32, HALF as f32),
            Vec2::new(-HALF as f32, i as f32),
            Vec2::new(HALF as f32, i as f32),
        ] {
            if pos == door {
                continue;
            }
            make_wall(store.create(), pos);
        }
    }
    make_door(store.create(), door);
    make_register(store.create(), Vec2::new(3.0, -3.0), FrontFaceDirection::Left);
    make_register(store.create(), Vec2::new(3.0, 3.0), FrontFaceDirection::Left);
    make_table(store.create(), Vec2::new(0.0, 0.0));
    make_toilet(store.create(), Vec2::new(6.0, 6.0));
    make_customer_spawner(store.create(), Vec2::new(-HALF as f32 - 2.0, 0.0), config);
    tracing::info!(entities = store.len(), "seeded world");
}

#[cfg(test)]
mod tests {
    use barkeep_ecs::{NamedEntity, RunMode};

    use super::*;
    use crate::query::{GameQueryExt, query};

    #[test]
    fn test_customer_has_ai_bundle() {
        let mut store = EntityStore::new(RunMode::Server);
        let customer = store.create();
        make_customer(customer, Vec2::new(1.0, 2.0));
        assert_eq!(customer.entity_type, EntityType::Customer);
        assert!(customer.has::<IsAiControlled>());
        assert_eq!(customer.get::<CanPathfind>().parent, customer.id);
        assert_eq!(customer.get::<Transform>().as2(), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_door_hooks_point_at_itself() {
        let mut door = Entity::new();
        make_door(&mut door, Vec2::ZERO);
        let hooks = door.get::<RespondsToDayNight>();
        assert_eq!(hooks.parent, door.id);
        assert_eq!(hooks.night_start_hooks(), vec![DayNightHook::OpenDoor]);
        assert_eq!(hooks.day_start_hooks(), vec![DayNightHook::CloseDoor]);
    }

    #[test]
    fn test_seed_world() {
        let mut store = EntityStore::new(RunMode::Server);
        let config = GameConfig::default();
        seed_world(&mut store, &config);

        let sophie = store.get_named_entity(NamedEntity::Sophie);
        assert!(store.is_permanent(sophie.id));
        assert_eq!(sophie.get::<IsBank>().balance(), config.starting_balance);
        assert_eq!(
            query(&store).where_type(EntityType::Register).gen_count(),
            2
        );
        assert_eq!(query(&store).where_type(EntityType::Door).gen_count(), 1);
        assert!(
            !query(&store)
                .where_type(EntityType::Wall)
                .where_snapped_position_matches(Vec2::new(-8.0, 0.0))
                .has_values()
        );
        let spawner = query(&store)
            .where_type(EntityType::CustomerSpawner)
            .gen_first_enforce();
        assert_eq!(
            spawner.get::<IsSpawner>().max_spawned(),
            config.customers_first_night
        );
    }
}
