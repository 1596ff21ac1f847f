use bencher::{benchmark_group, benchmark_main, Bencher};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use vcells::{Builder, Point3};

benchmark_main!(benches);
benchmark_group!(benches, tessellate_uniform, grid_sort, knn_search);

const SEED: u64 = 123456789;

fn random_points(n: usize, rng: &mut StdRng) -> Vec<Point3> {
    (0..n)
        .map(|_| {
            Point3::new(
                rng.gen_range(0.0001..0.9999),
                rng.gen_range(0.0001..0.9999),
                rng.gen_range(0.0001..0.9999),
            )
        })
        .collect()
}

fn tessellate_uniform(bench: &mut Bencher) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let points = random_points(1024, &mut rng);
    let config = Builder::new().k(32).knn_grid_resolution(16).build();
    bench.iter(|| vcells::tessellate(points.clone(), config.clone()).unwrap())
}

fn grid_sort(bench: &mut Bencher) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let points = random_points(4096, &mut rng);
    bench.iter(|| vcells::grid::sort(points.clone(), 16))
}

fn knn_search(bench: &mut Bencher) {
    let mut rng = StdRng::seed_from_u64(SEED);
    let points = random_points(4096, &mut rng);
    let grid = vcells::grid::sort(points, 16);
    let k = 32;
    let mut scratch = vcells::knn::KnnScratch::new(k);
    bench.iter(|| {
        for i in 0..grid.points.len() {
            vcells::knn::search(&grid, i, k, &mut scratch);
        }
    })
}
