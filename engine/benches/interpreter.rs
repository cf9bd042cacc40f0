//! Benches for the interpreter.
//!
//! Implemented benches:
//!
//! - Multiplication of `ELEMENTS` randomly selected numbers (native, parsing only,
//!   evaluating a pre-built tree, and the complete pipeline)
//! - Product of random square matrices supplied via symbols
//! - Reductions from the prelude over a long vector

use criterion::{criterion_group, criterion_main, BatchSize, Bencher, Criterion, Throughput};
use rand::{rngs::StdRng, Rng, SeedableRng};

use mathexpr::{Context, Interpreter, Matrix, Scalar, Symbols, TokenSet, Value};

const SEED: u64 = 123;
const ELEMENTS: u64 = 50;
const MATRIX_SIZE: usize = 16;
const VECTOR_LEN: usize = 1_000;

fn random_product(rng: &mut impl Rng) -> String {
    let values: Vec<_> = (0..ELEMENTS)
        .map(|_| rng.gen_range(0.5_f64..1.5).to_string())
        .collect();
    values.join(" * ")
}

fn random_matrix(rng: &mut impl Rng, rows: usize, cols: usize) -> Value {
    let matrix = Matrix::from_fn(rows, cols, |_, _| Scalar::real(rng.gen_range(-1.0..1.0)));
    let matrix = matrix.expect("benchmark matrix is small");
    Value::matrix(matrix)
}

fn bench_mul_native(bencher: &mut Bencher<'_>) {
    let mut rng = StdRng::seed_from_u64(SEED);

    bencher.iter_batched(
        || {
            (0..ELEMENTS)
                .map(|_| rng.gen_range(0.5_f64..1.5))
                .collect::<Vec<_>>()
        },
        |values| values.into_iter().product::<f64>(),
        BatchSize::SmallInput,
    );
}

fn bench_mul_parse(bencher: &mut Bencher<'_>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let tokens = TokenSet::builtin();

    bencher.iter_batched(
        || random_product(&mut rng),
        |input| tokens.build_tree(&input).unwrap(),
        BatchSize::SmallInput,
    );
}

fn bench_mul_tree(bencher: &mut Bencher<'_>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let tokens = TokenSet::builtin();
    let context = Context::new();
    let symbols = Symbols::new();

    bencher.iter_batched(
        || tokens.build_tree(&random_product(&mut rng)).unwrap(),
        |tree| Interpreter::new(&context, &symbols).evaluate(&tree).unwrap(),
        BatchSize::SmallInput,
    );
}

fn bench_mul(bencher: &mut Bencher<'_>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let context = Context::new();
    let symbols = Symbols::new();

    bencher.iter_batched(
        || random_product(&mut rng),
        |input| mathexpr::evaluate(&context, &input, &symbols).unwrap(),
        BatchSize::SmallInput,
    );
}

fn bench_interpreter(criterion: &mut Criterion) {
    criterion
        .benchmark_group("mul")
        .bench_function("native", bench_mul_native)
        .bench_function("parse", bench_mul_parse)
        .bench_function("tree", bench_mul_tree)
        .bench_function("int", bench_mul)
        .throughput(Throughput::Elements(ELEMENTS));
}

fn bench_matmul(bencher: &mut Bencher<'_>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let context = Context::new();

    bencher.iter_batched(
        || {
            Symbols::new()
                .with("a", random_matrix(&mut rng, MATRIX_SIZE, MATRIX_SIZE))
                .with("b", random_matrix(&mut rng, MATRIX_SIZE, MATRIX_SIZE))
        },
        |symbols| mathexpr::evaluate(&context, "a * b' + a", &symbols).unwrap(),
        BatchSize::SmallInput,
    );
}

fn bench_reductions(bencher: &mut Bencher<'_>) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let context = Context::with_prelude();

    bencher.iter_batched(
        || Symbols::new().with("xs", random_matrix(&mut rng, 1, VECTOR_LEN)),
        |symbols| {
            mathexpr::evaluate(&context, "max(xs) - min(xs) + mean(abs(xs))", &symbols).unwrap()
        },
        BatchSize::SmallInput,
    );
}

fn bench_matrices(criterion: &mut Criterion) {
    criterion
        .benchmark_group("matrices")
        .bench_function("matmul", bench_matmul)
        .bench_function("reductions", bench_reductions);
}

criterion_group!(benches, bench_interpreter, bench_matrices);
criterion_main!(benches);
