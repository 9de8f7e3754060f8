use std::sync::Arc;

use glam::Vec2;
use proptest::prelude::*;
use spiritfield_core::{
    Direction, Event, MergePolicy, MovementProperties, Point, Realm, Rect, TileBehaviors,
    TileIndex,
};
use spiritfield_system_movement::{
    can_move_down, can_move_left, can_move_right, can_move_up, check_move, get_jump_vector,
    move_actor, BlockReason, Movement,
};
use spiritfield_world::{
    ActorDefinition, AreaDefinition, AreaInstance, HitContext, LayerDefinition, Obstacle,
    ObstacleDefinition, PaletteDefinition, Registries,
};

const PLAIN: u16 = 1;

fn registries(tiles: Vec<TileBehaviors>, movement: MovementProperties) -> Registries {
    let mut registries = Registries::new();
    let mut palette = vec![TileBehaviors::default()];
    palette.extend(tiles);
    registries
        .register_palette(
            TileIndex::new(PLAIN),
            &PaletteDefinition {
                key: "overworld".to_owned(),
                tiles: palette,
                ..PaletteDefinition::default()
            },
        )
        .expect("palette registers");
    registries
        .register_actor(
            "hero",
            ActorDefinition {
                width: 8.0,
                height: 8.0,
                movement,
                ..ActorDefinition::default()
            },
        )
        .expect("actor registers");
    registries
}

fn area(registries: Registries, layout: &[u16], width: u32) -> AreaInstance {
    let definition = AreaDefinition {
        width,
        height: layout.len() as u32 / width,
        layers: vec![LayerDefinition {
            key: "floor".to_owned(),
            tiles: layout.iter().copied().map(TileIndex::new).collect(),
        }],
        objects: Vec::new(),
    };
    AreaInstance::new(
        Realm::Material,
        &definition,
        Arc::new(registries),
        MergePolicy::Additive,
    )
    .expect("area builds")
}

fn open_field(movement: MovementProperties) -> AreaInstance {
    area(registries(Vec::new(), movement), &[PLAIN; 64], 8)
}

fn hitbox_of(area: &AreaInstance, id: spiritfield_core::ObjectId) -> Rect {
    area.object(id)
        .and_then(|object| object.hitbox())
        .expect("object has a hitbox")
}

/// Row of high tiles above a row of low ones whose top edge is a ledge.
fn ledge_area(movement: MovementProperties) -> AreaInstance {
    let mut low = TileBehaviors::default();
    low.ledges.up = Some(true);
    let registries = registries(vec![low], movement);
    let low = PLAIN + 1;
    area(
        registries,
        &[PLAIN, PLAIN, PLAIN, low, low, low, PLAIN, PLAIN, PLAIN],
        3,
    )
}

proptest! {
    #[test]
    fn open_terrain_allows_every_direction(
        x in 16.0f32..96.0,
        y in 16.0f32..96.0,
        w in 1.0f32..16.0,
        h in 1.0f32..16.0,
    ) {
        let area = open_field(MovementProperties::default());
        let hitbox = Rect::new(x, y, w, h);
        let properties = MovementProperties::default();
        prop_assert!(can_move_up(&area, &hitbox, &properties));
        prop_assert!(can_move_down(&area, &hitbox, &properties));
        prop_assert!(can_move_left(&area, &hitbox, &properties));
        prop_assert!(can_move_right(&area, &hitbox, &properties));
    }

    #[test]
    fn moving_there_and_back_returns_home(dx in -12i32..12, dy in -12i32..12) {
        let mut area = open_field(MovementProperties::default());
        let hero = area.spawn_actor("hero", Point::new(48.0, 48.0)).expect("hero spawns");
        let mut events = Vec::new();

        let there = move_actor(&mut area, hero, dx as f32, dy as f32, &mut events);
        let back = move_actor(&mut area, hero, -dx as f32, -dy as f32, &mut events);

        prop_assert_eq!((there.moved_x, there.moved_y), (dx as f32, dy as f32));
        prop_assert_eq!((back.moved_x, back.moved_y), (-dx as f32, -dy as f32));
        prop_assert_eq!(hitbox_of(&area, hero), Rect::new(48.0, 48.0, 8.0, 8.0));
    }

    #[test]
    fn walkers_never_climb_back_over_a_ledge(
        x in 0i32..=40,
        y in 13i32..=40,
        steps in prop::collection::vec(0usize..4, 1..96),
    ) {
        let area = ledge_area(MovementProperties::default());
        let walker = MovementProperties {
            bounding_box: Some(Rect::new(0.0, 0.0, 48.0, 48.0)),
            ..MovementProperties::default()
        };
        let directions = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

        let mut hitbox = Rect::new(x as f32, y as f32, 8.0, 8.0);
        for step in steps {
            let direction = directions[step];
            if check_move(&area, &hitbox, direction, &walker).is_ok() {
                let (dx, dy) = direction.delta();
                hitbox = hitbox.translated(dx as f32, dy as f32);
            }
            // Upper anchor row of an 8 pixel body; the low side starts at 16.
            prop_assert!(hitbox.y as i32 + 3 >= 16, "climbed to {:?}", hitbox);
        }
    }
}

#[test]
fn ledges_can_be_dropped_but_not_climbed() {
    let area = ledge_area(MovementProperties::default());
    let walker = MovementProperties::default();

    let below = Rect::new(16.0, 16.0, 8.0, 8.0);
    let blocked = check_move(&area, &below, Direction::Up, &walker).expect_err("climbing");
    assert_eq!(blocked.reason, BlockReason::Ledge);

    let above = Rect::new(16.0, 8.0, 8.0, 8.0);
    let step = check_move(&area, &above, Direction::Down, &walker).expect("dropping");
    assert!(step.descends);

    let flyer = MovementProperties {
        can_fly: true,
        ..MovementProperties::default()
    };
    assert!(can_move_up(&area, &below, &flyer));
}

#[test]
fn sideways_moves_along_a_ledge_stay_level() {
    let area = ledge_area(MovementProperties::default());
    let walker = MovementProperties::default();
    let straddling = Rect::new(16.0, 12.0, 8.0, 8.0);
    assert!(can_move_right(&area, &straddling, &walker));
    assert!(can_move_left(&area, &straddling, &walker));
}

#[test]
fn body_below_a_ledge_cannot_push_back_over_it() {
    let area = ledge_area(MovementProperties::default());
    let walker = MovementProperties::default();
    // Top two rows still overlap the high side, the middle is on the low side.
    let dropped = Rect::new(16.0, 14.0, 8.0, 8.0);

    let up = check_move(&area, &dropped, Direction::Up, &walker).expect_err("ledge above");
    assert_eq!(up.reason, BlockReason::Ledge);
    assert!(can_move_left(&area, &dropped, &walker));
    assert!(can_move_right(&area, &dropped, &walker));
    assert!(can_move_down(&area, &dropped, &walker));

    let flyer = MovementProperties {
        can_fly: true,
        ..MovementProperties::default()
    };
    assert!(can_move_up(&area, &dropped, &flyer));
}

#[test]
fn body_above_a_ledge_moves_freely() {
    let area = ledge_area(MovementProperties::default());
    let walker = MovementProperties::default();
    // Bottom two rows hang over the low side, the middle is on the high side.
    let hanging = Rect::new(16.0, 10.0, 8.0, 8.0);

    assert!(can_move_up(&area, &hanging, &walker));
    assert!(can_move_left(&area, &hanging, &walker));
    assert!(can_move_right(&area, &hanging, &walker));
    let down = check_move(&area, &hanging, Direction::Down, &walker).expect("dropping further");
    assert!(!down.descends);
}

#[test]
fn side_ledges_block_only_the_climbing_direction() {
    let mut low = TileBehaviors::default();
    low.ledges.left = Some(true);
    let low_index = PLAIN + 1;
    let area = area(
        registries(vec![low], MovementProperties::default()),
        &[PLAIN, low_index, low_index],
        3,
    );
    let walker = MovementProperties::default();
    let straddling = Rect::new(14.0, 0.0, 8.0, 8.0);

    let left = check_move(&area, &straddling, Direction::Left, &walker).expect_err("ledge");
    assert_eq!(left.reason, BlockReason::Ledge);
    assert!(can_move_right(&area, &straddling, &walker));
    assert!(can_move_up(&area, &straddling, &walker));
    assert!(can_move_down(&area, &straddling, &walker));
}

#[test]
fn walking_into_a_ledge_from_below_goes_nowhere() {
    let mut area = ledge_area(MovementProperties::default());
    let hero = area.spawn_actor("hero", Point::new(16.0, 14.0)).expect("spawn");

    let result = move_actor(&mut area, hero, 0.0, -20.0, &mut Vec::new());
    assert!(result.blocked_y);
    assert_eq!(result.moved_y, 0.0);
    assert_eq!(
        result.blocker.map(|blocker| blocker.reason),
        Some(BlockReason::Ledge)
    );

    let result = move_actor(&mut area, hero, 8.0, 0.0, &mut Vec::new());
    assert_eq!(result.moved_x, 8.0);
    assert_eq!(hitbox_of(&area, hero), Rect::new(24.0, 14.0, 8.0, 8.0));
}

#[test]
fn solid_bitmaps_are_resolved_per_pixel() {
    let wall = TileBehaviors {
        solid_map: Some([0x8000; 16]),
        ..TileBehaviors::default()
    };
    let wall_index = PLAIN + 1;
    let area = area(
        registries(vec![wall], MovementProperties::default()),
        &[PLAIN, PLAIN, PLAIN, PLAIN, wall_index, PLAIN],
        3,
    );
    let walker = MovementProperties::default();

    assert!(can_move_down(&area, &Rect::new(31.0, 15.0, 1.0, 1.0), &walker));
    let blocked = check_move(&area, &Rect::new(16.0, 15.0, 1.0, 1.0), Direction::Down, &walker)
        .expect_err("solid column");
    assert_eq!(blocked.reason, BlockReason::Solid);

    let strict = MovementProperties {
        needs_full_tile: true,
        ..MovementProperties::default()
    };
    assert!(!can_move_down(&area, &Rect::new(31.0, 15.0, 1.0, 1.0), &strict));
}

#[test]
fn pits_and_water_need_the_matching_capability() {
    let pit = TileBehaviors {
        pit: true,
        ..TileBehaviors::default()
    };
    let water = TileBehaviors {
        water: true,
        ..TileBehaviors::default()
    };
    let area = area(
        registries(vec![pit, water], MovementProperties::default()),
        &[PLAIN + 1, PLAIN, PLAIN + 2],
        3,
    );
    let hitbox = Rect::new(16.0, 0.0, 16.0, 16.0);

    let walker = MovementProperties::default();
    let into_pit = check_move(&area, &hitbox, Direction::Left, &walker).expect_err("pit");
    let into_water = check_move(&area, &hitbox, Direction::Right, &walker).expect_err("water");
    assert_eq!(into_pit.reason, BlockReason::Pit);
    assert_eq!(into_water.reason, BlockReason::Water);

    let faller = MovementProperties {
        can_fall: true,
        can_swim: true,
        ..MovementProperties::default()
    };
    assert!(can_move_left(&area, &hitbox, &faller));
    assert!(can_move_right(&area, &hitbox, &faller));
}

#[test]
fn pixels_beyond_the_grid_are_open() {
    let area = area(registries(Vec::new(), MovementProperties::default()), &[PLAIN], 1);
    let hitbox = Rect::new(8.0, 0.0, 8.0, 8.0);
    assert!(can_move_right(&area, &hitbox, &MovementProperties::default()));
    assert!(can_move_up(&area, &hitbox, &MovementProperties::default()));
}

#[test]
fn bounding_box_keeps_the_mover_inside() {
    let area = open_field(MovementProperties::default());
    let fenced = MovementProperties {
        bounding_box: Some(Rect::new(16.0, 16.0, 16.0, 16.0)),
        ..MovementProperties::default()
    };
    let hitbox = Rect::new(16.0, 16.0, 8.0, 8.0);
    let blocked = check_move(&area, &hitbox, Direction::Left, &fenced).expect_err("fence");
    assert_eq!(blocked.reason, BlockReason::Bounds);
    assert!(can_move_right(&area, &hitbox, &fenced));
}

#[test]
fn wiggling_slides_around_corners() {
    let corner = ObstacleDefinition {
        key: "rock".to_owned(),
        body: Rect::new(8.0, 8.0, 9.0, 8.0),
        solid: true,
        ..ObstacleDefinition::default()
    };

    let mut stiff = open_field(MovementProperties::default());
    let _ = stiff.add_object(Box::new(Obstacle::new(corner.clone())));
    let hero = stiff.spawn_actor("hero", Point::new(16.0, 16.0)).expect("spawn");
    let result = move_actor(&mut stiff, hero, 0.0, -2.0, &mut Vec::new());
    assert!(result.blocked_y);
    assert_eq!(
        result.blocker.map(|blocker| blocker.reason),
        Some(BlockReason::Object)
    );

    let mut nimble = open_field(MovementProperties {
        can_wiggle: true,
        ..MovementProperties::default()
    });
    let _ = nimble.add_object(Box::new(Obstacle::new(corner)));
    let hero = nimble.spawn_actor("hero", Point::new(16.0, 16.0)).expect("spawn");
    let result = move_actor(&mut nimble, hero, 0.0, -2.0, &mut Vec::new());
    assert!(!result.blocked_y);
    assert_eq!((result.moved_x, result.moved_y), (1.0, -2.0));
    assert_eq!(hitbox_of(&nimble, hero), Rect::new(17.0, 14.0, 8.0, 8.0));
}

#[test]
fn pushers_slide_pushable_objects_ahead() {
    let mut area = open_field(MovementProperties {
        can_push: true,
        ..MovementProperties::default()
    });
    let block = area.add_object(Box::new(Obstacle::new(ObstacleDefinition {
        key: "block".to_owned(),
        body: Rect::new(25.0, 16.0, 8.0, 8.0),
        solid: true,
        pushable: true,
        ..ObstacleDefinition::default()
    })));
    let hero = area.spawn_actor("hero", Point::new(16.0, 16.0)).expect("spawn");

    let mut events = Vec::new();
    let result = move_actor(&mut area, hero, 3.0, 0.0, &mut events);

    assert_eq!(result.moved_x, 3.0);
    assert_eq!(result.pushed, vec![block, block]);
    assert_eq!(hitbox_of(&area, block), Rect::new(27.0, 16.0, 8.0, 8.0));
    assert_eq!(
        events,
        vec![
            Event::ObjectPushed {
                realm: Realm::Material,
                object: block,
                direction: Direction::Right,
            };
            2
        ]
    );
}

#[test]
fn jump_vector_points_off_the_ledge() {
    let area = ledge_area(MovementProperties::default());
    let hanging = Rect::new(16.0, 10.0, 16.0, 10.0);
    assert_eq!(get_jump_vector(&area, &hanging), Vec2::new(0.0, 1.0));
    assert_eq!(
        get_jump_vector(&area, &Rect::new(16.0, 32.0, 8.0, 8.0)),
        Vec2::ZERO
    );
}

#[test]
fn jumpers_report_a_launch_after_dropping() {
    let mut area = ledge_area(MovementProperties {
        can_jump: true,
        ..MovementProperties::default()
    });
    let hero = area.spawn_actor("hero", Point::new(16.0, 6.0)).expect("spawn");
    let result = move_actor(&mut area, hero, 0.0, 4.0, &mut Vec::new());
    assert!(result.descended);
    assert!(result.jump.is_some());
}

#[test]
fn movement_settles_knockback_on_tick() {
    let mut area = open_field(MovementProperties::default());
    let hero = area.spawn_actor("hero", Point::new(32.0, 32.0)).expect("spawn");
    let response = area
        .object_mut(hero)
        .and_then(|object| object.as_hittable_mut())
        .map(|target| {
            target.on_hit(&HitContext {
                damage: 0.0,
                element: None,
                origin: Point::new(0.0, 36.0),
                knockback: Some(Vec2::new(4.0, 0.0)),
                source: None,
            })
        })
        .expect("actors are hittable");
    assert!(!response.defeated);

    let mut movement = Movement::default();
    let mut out = Vec::new();
    movement.handle(&[], &mut area, &mut out);
    assert_eq!(hitbox_of(&area, hero).x, 32.0);

    let tick = Event::TimeAdvanced {
        tick: 1,
        dt: spiritfield_core::FRAME_LENGTH,
    };
    movement.handle(&[tick], &mut area, &mut out);
    assert_eq!(hitbox_of(&area, hero).x, 36.0);
}
