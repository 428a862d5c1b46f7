//! Full missions: data files loaded through `homestead-data`, then played on
//! a `homestead-core` simulation driven by a manual clock.

use homestead_core::clock::{Clock, ManualClock};
use homestead_core::economy::PROGRESS_KEY;
use homestead_core::event::SimEvent;
use homestead_core::goal::Goal;
use homestead_core::id::*;
use homestead_core::machine::MachineState;
use homestead_core::persist::{MemoryStore, ProgressStore};
use homestead_core::sim::{Simulation, TickConfig};
use homestead_data::{Format, load_catalog, mission_from_str};
use std::fs;

const MISSION: &str = r#"{
    "id": 1,
    "targetCommon": { "startMoney": 100, "targetMoney": 300, "timeMission": 3 },
    "starCondition": { "twoStar": 200, "threeStar": 300, "reward": [10, 20, 30] },
    "farmData": {
        "fields": [ { "idField": 1, "startNumber": 2 } ],
        "harvestField": { "idField": 1, "targetNumber": 2 }
    },
    "factoryData": {
        "positionUnlock": { "positionUnLockBegin": 1, "targetPositionUnlock": 1 },
        "machines": [ { "iDMachine": 2 }, { "iDMachine": 1 } ],
        "targetProducts": 3
    }
}"#;

const CATALOG: &str = r#"{
    "crops": [ { "id": 7, "growthSeconds": 30, "sellPrice": 50 } ],
    "products": [ { "id": 1, "productionSeconds": 10, "sellPrice": 40 } ]
}"#;

const WHEAT: CropId = CropId(7);
const BREAD: ProductId = ProductId(1);

fn mission_sim(store: &MemoryStore) -> (ManualClock, Simulation) {
    let dir = tempfile::tempdir().unwrap();
    let catalog_path = dir.path().join("catalog.json");
    fs::write(&catalog_path, CATALOG).unwrap();

    let setup = mission_from_str(MISSION, Format::Json).unwrap();
    let catalog = load_catalog(&catalog_path).unwrap();
    let clock = ManualClock::new(0);
    let sim = Simulation::new(&setup, catalog, Box::new(clock.clone()))
        .with_store(Box::new(store.clone()));
    (clock, sim)
}

/// Advance one second at a time, stepping after each.
fn play_secs(clock: &ManualClock, sim: &mut Simulation, secs: u64) -> bool {
    let mut complete = false;
    for _ in 0..secs {
        clock.advance_secs(1);
        if let Some(report) = sim.step() {
            complete |= report.mission_complete;
        }
    }
    complete
}

#[test]
fn machine_positions_follow_sorted_ids() {
    let (_clock, sim) = mission_sim(&MemoryStore::new());
    let machines = sim.factory().machines();
    assert_eq!(machines[0].machine_id, MachineTypeId(1));
    assert_eq!(machines[0].state, MachineState::Locked);
    assert_eq!(machines[1].machine_id, MachineTypeId(2));
    assert_eq!(machines[1].state, MachineState::Idle);
}

#[test]
fn farming_and_production_win_the_mission() {
    let store = MemoryStore::new();
    let (clock, mut sim) = mission_sim(&store);

    let farmland = FieldRef::new(FieldKind::Farmland, 0);
    assert_eq!(sim.plant_batch(farmland, WHEAT, 2), 2);
    assert_eq!(sim.enqueue_batch(1, BREAD, 2), 2);

    // Bread takes 9 s on a level 1 machine, wheat 30 s.
    assert!(!play_secs(&clock, &mut sim, 30));
    assert_eq!(sim.factory().total_produced(), 2);
    assert_eq!(sim.economy().money(), 180);

    let harvest = sim.harvest_all();
    assert_eq!(harvest.count, 2);
    assert_eq!(sim.economy().money(), 280);
    assert_eq!(sim.economy().star(), 2);

    sim.enqueue(1, BREAD).unwrap();
    assert!(play_secs(&clock, &mut sim, 9));
    assert_eq!(sim.economy().money(), 320);
    assert_eq!(sim.economy().star(), 3);
    assert_eq!(sim.economy().reward(), 30);
    assert!(sim.economy().is_mission_complete());
    assert!(sim.all_goals_reached());
    assert!(sim.goals().contains(&Goal::Money { target: 300 }));

    let completions = sim
        .events()
        .iter()
        .filter(|e| matches!(e, SimEvent::MissionCompleted { .. }))
        .count();
    assert_eq!(completions, 1);

    let saved = store.get(PROGRESS_KEY).unwrap();
    assert_eq!(saved["money"], 320);
    assert_eq!(saved["star"], 3);
}

#[test]
fn snapshot_resumes_a_mission_in_progress() {
    let (clock, mut sim) = mission_sim(&MemoryStore::new());
    sim.plant(SlotRef::new(FieldKind::Farmland, 0, 0), WHEAT).unwrap();
    sim.enqueue_batch(1, BREAD, 3);
    play_secs(&clock, &mut sim, 12);
    let bytes = sim.save_snapshot().unwrap();

    let (other_clock, mut resumed) = mission_sim(&MemoryStore::new());
    resumed.restore_snapshot(&bytes).unwrap();
    other_clock.set(clock.now());

    assert_eq!(resumed.economy().money(), sim.economy().money());
    assert_eq!(resumed.farm(), sim.farm());
    assert_eq!(resumed.factory(), sim.factory());

    play_secs(&clock, &mut sim, 18);
    play_secs(&other_clock, &mut resumed, 18);
    assert_eq!(resumed.farm(), sim.farm());
    assert_eq!(resumed.factory(), sim.factory());
    assert_eq!(resumed.economy().money(), sim.economy().money());
}

#[test]
fn idle_days_run_out_the_clock() {
    let (clock, sim) = mission_sim(&MemoryStore::new());
    let mut sim = sim.with_config(TickConfig {
        day_length_ms: Some(5_000),
        ..TickConfig::default()
    });
    assert!(!play_secs(&clock, &mut sim, 14));
    assert_eq!(sim.economy().day(), 2);
    assert!(!sim.economy().is_game_over());

    // The first step counts no elapsed time, so day 3 starts at 16 s.
    play_secs(&clock, &mut sim, 2);
    assert_eq!(sim.economy().day(), 3);
    assert!(sim.economy().is_game_over());

    // Reaching the money target after the deadline no longer wins.
    sim.add_money(500);
    assert!(!sim.check_mission_complete());
}

#[test]
fn unlocking_the_second_position_doubles_throughput() {
    let (clock, mut sim) = mission_sim(&MemoryStore::new());
    sim.add_money(100);
    sim.unlock_machine(0, None).unwrap();
    assert_eq!(sim.economy().money(), 0);

    sim.enqueue(0, BREAD).unwrap();
    sim.enqueue(1, BREAD).unwrap();
    assert_eq!(sim.producing_count(), 2);
    play_secs(&clock, &mut sim, 9);
    assert_eq!(sim.factory().total_produced(), 2);
    assert_eq!(sim.economy().money(), 80);
}
