//! Benchmarks stackcode — conversions (Criterion)
//!
//! Variables d’environnement :
//!   BENCH_JUMPS=64                 (def=64)  — sauts par programme synthétique
//!
//! Criterion :
//!   CRIT_SAMPLES (def=50) | CRIT_WARMUP_MS (def=300) | CRIT_MEASURE_MS (def=1200)
//!
//! Suites :
//!   - convert/assemble     → symbolique → brut, blocs courts puis blocs > 64 KiB (sauts étendus)
//!   - convert/disassemble  → brut → concret (repliement EXTENDED_ARG)
//!   - convert/reconstruct  → concret → symbolique

use anyhow::Result;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stackcode_asm::prelude::*;
use std::time::Duration;

// -------------------------------------------------------------------------------------
// Helpers env
// -------------------------------------------------------------------------------------
fn env_usize(k: &str, d: usize) -> usize {
    std::env::var(k).ok().and_then(|s| s.parse().ok()).unwrap_or(d)
}
fn env_u64(k: &str, d: u64) -> u64 {
    std::env::var(k).ok().and_then(|s| s.parse().ok()).unwrap_or(d)
}

// -------------------------------------------------------------------------------------
// Programmes synthétiques
// -------------------------------------------------------------------------------------

/// `jumps` blocs `x = x + k` de `block` instructions, chacun précédé d’un
/// saut conditionnel vers la fin et suivi d’un saut arrière vers le début.
fn synthetic(jumps: usize, block: usize) -> Result<Bytecode> {
    let mut bc = Bytecode::new(CodeMeta { name: "synthetic".into(), ..CodeMeta::default() });
    let top = Label::new();
    let end = Label::new();
    bc.push(top);
    for j in 0..jumps {
        bc.push(Item::SetLineno(u32::try_from(j + 2)?));
        bc.emit("LOAD_NAME", Operand::Name("x".into()))?;
        bc.emit("POP_JUMP_IF_FALSE", end.into())?;
        for k in 0..block / 4 {
            bc.emit("LOAD_NAME", Operand::Name("x".into()))?;
            bc.emit("LOAD_CONST", ConstValue::Int(i64::try_from(k % 32)?).into())?;
            bc.emit("BINARY_ADD", Operand::None)?;
            bc.emit("STORE_NAME", Operand::Name("x".into()))?;
        }
        bc.emit("JUMP_ABSOLUTE", top.into())?;
    }
    bc.push(end);
    bc.emit("LOAD_CONST", ConstValue::None.into())?;
    bc.emit("RETURN_VALUE", Operand::None)?;
    Ok(bc)
}

// -------------------------------------------------------------------------------------
// Suites
// -------------------------------------------------------------------------------------

fn bench_convert(c: &mut Criterion) {
    let jumps = env_usize("BENCH_JUMPS", 64);

    let mut group = c.benchmark_group("convert");
    group.sample_size(env_usize("CRIT_SAMPLES", 50));
    group.warm_up_time(Duration::from_millis(env_u64("CRIT_WARMUP_MS", 300)));
    group.measurement_time(Duration::from_millis(env_u64("CRIT_MEASURE_MS", 1200)));

    // 16 instructions par bloc : tout tient sur 3 octets ; 4096 : la fin du
    // code passe 0xFFFF et les sauts vers `end` s’étendent.
    for block in [16usize, 4096] {
        let id = format!("{jumps}x{block}");
        let bc = match synthetic(jumps, block) {
            Ok(bc) => bc,
            Err(e) => {
                eprintln!("[convert] programme {id} invalide: {e}");
                continue;
            }
        };
        let raw = match bc.to_raw(&AssembleOptions::default()) {
            Ok(raw) => raw,
            Err(e) => {
                eprintln!("[convert] assemblage {id} impossible: {e}");
                continue;
            }
        };
        group.throughput(Throughput::Bytes(raw.code.len() as u64));

        group.bench_with_input(BenchmarkId::new("assemble", &id), &bc, |b, bc| {
            b.iter(|| bc.to_raw(black_box(&AssembleOptions::default())));
        });

        group.bench_with_input(BenchmarkId::new("disassemble", &id), &raw, |b, raw| {
            b.iter(|| ConcreteBytecode::from_raw(black_box(raw), &DisassembleOptions::default()));
        });

        if let Ok(concrete) = ConcreteBytecode::from_raw(&raw, &DisassembleOptions::default()) {
            group.bench_with_input(BenchmarkId::new("reconstruct", &id), &concrete, |b, concrete| {
                b.iter(|| black_box(concrete).to_bytecode());
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_convert);
criterion_main!(benches);
