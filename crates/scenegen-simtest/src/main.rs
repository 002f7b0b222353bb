//! SceneGen Headless Generation Harness
//!
//! Generates scenes from the sample document for a sweep of seeds and
//! re-checks every placement invariant on the output. Runs entirely
//! in-process, with no engine and no rendering.
//!
//! Usage:
//!   cargo run -p scenegen-simtest
//!   cargo run -p scenegen-simtest -- --verbose
//!   cargo run -p scenegen-simtest -- --seeds 200
//!   cargo run -p scenegen-simtest -- --dump 7

use std::collections::{HashMap, HashSet};

use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use scenegen_logic::config::GenerationSettings;
use scenegen_logic::distribution::{Choice, Resolve};
use scenegen_logic::error::GenerationError;
use scenegen_logic::generator::{SceneConfig, SceneGenerator};
use scenegen_logic::scene::Scene;
use scenegen_logic::validation::audit_scene;

// ── Sample document (same JSON the integration docs use) ───────────────
const SAMPLE_JSON: &str = include_str!("../../../data/sample_scene.json");

const DEFAULT_SEEDS: u64 = 50;

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

struct Args {
    verbose: bool,
    seeds: u64,
    dump: Option<u64>,
}

fn parse_args() -> Args {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let value_after = |flag: &str| {
        args.iter()
            .position(|a| a == flag)
            .and_then(|i| args.get(i + 1))
            .and_then(|v| v.parse::<u64>().ok())
    };
    Args {
        verbose: args.iter().any(|a| a == "--verbose"),
        seeds: value_after("--seeds").unwrap_or(DEFAULT_SEEDS),
        dump: value_after("--dump"),
    }
}

fn main() {
    let args = parse_args();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if args.verbose { "info" } else { "warn" }));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let raw: Value = match serde_json::from_str(SAMPLE_JSON) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("sample document is not valid JSON: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(seed) = args.dump {
        dump_scene(&raw, seed);
        return;
    }

    println!("=== SceneGen Generation Harness ===\n");

    let mut results = Vec::new();

    // 1. Sample document casts cleanly
    results.extend(validate_sample_document(&raw));

    // 2. Seed sweep over the sample document
    results.extend(validate_seed_sweep(&raw, args.seeds, args.verbose));

    // 3. Same seed, same scene
    results.extend(validate_reproducibility(&raw));

    // 4. Resolver distribution checks
    results.extend(validate_resolver());

    // 5. Error paths
    results.extend(validate_error_paths());

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || args.verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn generate(raw: &Value, seed: u64) -> Result<Scene, GenerationError> {
    let generator = SceneGenerator::new(GenerationSettings {
        seed: Some(seed),
        ..Default::default()
    });
    generator.generate_json(raw, &mut generator.rng())
}

fn dump_scene(raw: &Value, seed: u64) {
    match generate(raw, seed).map(|scene| scene.to_json()) {
        Ok(Ok(text)) => println!("{}", text),
        Ok(Err(e)) => {
            eprintln!("could not serialize scene: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("seed {}: {}", seed, e);
            std::process::exit(1);
        }
    }
}

// ── 1. Sample Document ──────────────────────────────────────────────────

fn validate_sample_document(raw: &Value) -> Vec<TestResult> {
    println!("--- Sample Document ---");
    let mut results = Vec::new();

    match SceneConfig::from_json(raw) {
        Ok(config) => {
            let groups = [
                ("walls", config.walls.len()),
                ("floor_patches", config.floor_patches.len()),
                ("objects", config.objects.len()),
                ("launchers", config.launchers.len()),
                ("agents", config.agents.len()),
            ];
            results.push(TestResult {
                name: "sample_casts".into(),
                passed: true,
                detail: "sample document passes every type check".into(),
            });
            results.push(TestResult {
                name: "sample_all_groups".into(),
                passed: groups.iter().all(|(_, n)| *n > 0),
                detail: groups
                    .iter()
                    .map(|(g, n)| format!("{}={}", g, n))
                    .collect::<Vec<_>>()
                    .join(" "),
            });
        }
        Err(e) => results.push(TestResult {
            name: "sample_casts".into(),
            passed: false,
            detail: e.to_string(),
        }),
    }

    results
}

// ── 2. Seed Sweep ───────────────────────────────────────────────────────

fn validate_seed_sweep(raw: &Value, seeds: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Seed Sweep ({} seeds) ---", seeds);
    let mut results = Vec::new();

    let mut generated = Vec::new();
    let mut failures = Vec::new();
    for seed in 0..seeds {
        match generate(raw, seed) {
            Ok(scene) => generated.push((seed, scene)),
            Err(e) => failures.push(format!("seed {}: {}", seed, e)),
        }
    }

    // Rooms are roomy enough that every seed should place everything
    results.push(TestResult {
        name: "sweep_all_seeds_generate".into(),
        passed: failures.is_empty(),
        detail: if failures.is_empty() {
            format!("{} scenes generated", generated.len())
        } else {
            format!("{} failed: {}", failures.len(), failures.join("; "))
        },
    });

    // Audit: overlaps, extents, dangling links
    let mut audit_failures = Vec::new();
    for (seed, scene) in &generated {
        for issue in audit_scene(scene) {
            audit_failures.push(format!("seed {} [{}] {}", seed, issue.category, issue.message));
        }
    }
    results.push(TestResult {
        name: "sweep_audit_clean".into(),
        passed: audit_failures.is_empty(),
        detail: if audit_failures.is_empty() {
            "no overlaps, no objects outside the room, no dangling links".into()
        } else {
            audit_failures.join("; ")
        },
    });

    // Unique ids
    let duplicate_ids = generated
        .iter()
        .filter(|(_, scene)| {
            let ids: HashSet<_> = scene.objects.iter().map(|o| o.id.as_str()).collect();
            ids.len() != scene.objects.len()
        })
        .count();
    results.push(TestResult {
        name: "sweep_unique_ids".into(),
        passed: duplicate_ids == 0,
        detail: format!("{} scene(s) with duplicate object ids", duplicate_ids),
    });

    // Every launcher fires its own projectile
    let mut bad_wiring = 0;
    for (_, scene) in &generated {
        for launcher in scene.objects_of("launchers").filter(|o| o.shape == "launcher") {
            let wired = launcher.timeline.iter().any(|e| {
                e.action == "launch"
                    && e.target
                        .as_deref()
                        .and_then(|t| scene.object(t))
                        .is_some_and(|p| p.moved_by.as_deref() == Some(launcher.id.as_str()))
            });
            if !wired {
                bad_wiring += 1;
            }
        }
    }
    results.push(TestResult {
        name: "sweep_launcher_wiring".into(),
        passed: bad_wiring == 0,
        detail: format!("{} launcher(s) without a linked projectile", bad_wiring),
    });

    // Agent timelines sorted and non-overlapping
    let mut bad_timelines = 0;
    for (_, scene) in &generated {
        for agent in scene.objects_of("agents") {
            let ordered = agent
                .timeline
                .windows(2)
                .all(|w| w[0].step_end <= w[1].step_begin);
            if !ordered {
                bad_timelines += 1;
            }
        }
    }
    results.push(TestResult {
        name: "sweep_agent_timelines".into(),
        passed: bad_timelines == 0,
        detail: format!("{} agent(s) with overlapping actions", bad_timelines),
    });

    // Only walkable objects may sit on the performer start
    let mut covered = Vec::new();
    for (seed, scene) in &generated {
        let start = scene.performer_start.position.floor();
        for o in scene.objects.iter().filter(|o| o.shape != "rug") {
            if o.footprint.contains(start) {
                covered.push(format!("seed {}: {}", seed, o.id));
            }
        }
    }
    results.push(TestResult {
        name: "sweep_performer_clear".into(),
        passed: covered.is_empty(),
        detail: if covered.is_empty() {
            "performer start never enclosed".into()
        } else {
            covered.join(", ")
        },
    });

    if verbose {
        let mut by_kind: HashMap<&str, usize> = HashMap::new();
        for (_, scene) in &generated {
            for o in &scene.objects {
                *by_kind.entry(o.kind.as_str()).or_default() += 1;
            }
        }
        let mut kinds: Vec<_> = by_kind.into_iter().collect();
        kinds.sort();
        println!("  Objects placed across the sweep:");
        for (kind, count) in kinds {
            println!("    {:14}: {}", kind, count);
        }
    }

    results
}

// ── 3. Reproducibility ──────────────────────────────────────────────────

fn validate_reproducibility(raw: &Value) -> Vec<TestResult> {
    println!("--- Reproducibility ---");
    let mut results = Vec::new();

    for seed in [1_u64, 17, 99] {
        let a = generate(raw, seed).ok().and_then(|s| s.to_json().ok());
        let b = generate(raw, seed).ok().and_then(|s| s.to_json().ok());
        results.push(TestResult {
            name: format!("repro_seed_{}", seed),
            passed: a.is_some() && a == b,
            detail: format!("two runs of seed {} match", seed),
        });
    }

    results
}

// ── 4. Resolver ─────────────────────────────────────────────────────────

fn validate_resolver() -> Vec<TestResult> {
    println!("--- Resolver ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(2024);

    // Integer ranges include both endpoints
    let steps: Choice<i64> = Choice::range(1, 4);
    let mut seen = HashSet::new();
    let mut out_of_range = 0;
    for _ in 0..2000 {
        let v = steps.resolve(&mut rng);
        if !(1..=4).contains(&v) {
            out_of_range += 1;
        }
        seen.insert(v);
    }
    results.push(TestResult {
        name: "resolver_int_inclusive".into(),
        passed: out_of_range == 0 && seen.contains(&1) && seen.contains(&4),
        detail: format!("values seen {:?}, {} out of range", sorted(&seen), out_of_range),
    });

    // Float ranges stay in bounds with 4 decimals
    let scale: Choice<f64> = Choice::range(0.25, 0.75);
    let bad_floats = (0..2000)
        .map(|_| scale.resolve(&mut rng))
        .filter(|v| !(0.25..=0.75).contains(v) || ((v * 1e4).round() - v * 1e4).abs() > 1e-6)
        .count();
    results.push(TestResult {
        name: "resolver_float_rounded".into(),
        passed: bad_floats == 0,
        detail: format!("{} draws out of range or unrounded", bad_floats),
    });

    // Nested lists reach every leaf
    let nested = Choice::one_of(vec![Choice::Fixed(0_i64), Choice::range(10, 11)]);
    let leaves: HashSet<i64> = match &nested {
        Some(choice) => (0..500).map(|_| choice.resolve(&mut rng)).collect(),
        None => HashSet::new(),
    };
    debug!("nested leaves: {:?}", leaves);
    results.push(TestResult {
        name: "resolver_nested_list".into(),
        passed: leaves.len() == 3,
        detail: format!("leaves reached {:?}", sorted(&leaves)),
    });

    results
}

fn sorted(values: &HashSet<i64>) -> Vec<i64> {
    let mut v: Vec<_> = values.iter().copied().collect();
    v.sort_unstable();
    v
}

// ── 5. Error Paths ──────────────────────────────────────────────────────

fn validate_error_paths() -> Vec<TestResult> {
    println!("--- Error Paths ---");
    let mut results = Vec::new();

    // Bad types are all reported together
    let bad = json!({
        "objects": [{"num": true}, {"shape": {"min": 1, "max": 2}}],
        "agents": [{"actions": [{"step_begin": 1}]}]
    });
    match generate(&bad, 0) {
        Err(GenerationError::ConfigType(e)) => {
            let paths = e.paths();
            let expected = [
                "objects[0].num",
                "objects[1].shape",
                "agents[0].actions[0].id",
            ];
            results.push(TestResult {
                name: "errors_type_aggregated".into(),
                passed: paths == expected,
                detail: format!("paths {:?}", paths),
            });
        }
        other => results.push(TestResult {
            name: "errors_type_aggregated".into(),
            passed: false,
            detail: format!("expected a type error, got {:?}", other.map(|s| s.objects.len())),
        }),
    }

    // Label nobody produces
    let undeclared = json!({"agents": [{"facing": "nothing_here"}]});
    let err = generate(&undeclared, 0).err();
    results.push(TestResult {
        name: "errors_undeclared_label".into(),
        passed: matches!(err, Some(GenerationError::Configuration { .. })),
        detail: err.map(|e| e.to_string()).unwrap_or_else(|| "generated".into()),
    });

    // Impossible fixed overlap exhausts the budget
    let crowded = json!({
        "room": {"x": 10, "y": 3, "z": 10},
        "performer_start": {"position": {"x": 4.5, "z": 4.5}},
        "objects": [{
            "num": 2,
            "size": {"width": 2, "height": 1, "depth": 2},
            "position": {"x": 0, "z": 0}
        }]
    });
    let err = generate(&crowded, 0).err();
    results.push(TestResult {
        name: "errors_exhaustion".into(),
        passed: matches!(
            err,
            Some(GenerationError::PlacementExhausted { attempts: 50, .. })
        ),
        detail: err.map(|e| e.to_string()).unwrap_or_else(|| "generated".into()),
    });

    results
}
