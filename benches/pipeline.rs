// SPDX-License-Identifier: MPL-2.0
use criterion::{criterion_group, criterion_main, Criterion};
use image_rs::{GrayImage, Luma};
use medsr::domain::CanonicalImage;
use medsr::media::{degrade, tile_pairs, to_input_tensor};
use medsr::model::{initial_state_dict, Srcnn};
use ndarray::Array4;
use std::hint::black_box;

fn scan() -> GrayImage {
    GrayImage::from_fn(256, 256, |x, y| Luma([((x * 3 + y * 5) % 256) as u8]))
}

fn preprocessing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocessing");
    let image = scan();

    group.bench_function("degrade_256", |b| {
        b.iter(|| black_box(degrade(black_box(&image))));
    });

    let canonical = CanonicalImage::new(image.clone()).unwrap();
    group.bench_function("to_input_tensor_256", |b| {
        b.iter(|| black_box(to_input_tensor(black_box(canonical.as_gray()))));
    });

    let lr = degrade(&image);
    group.bench_function("tile_pairs_256", |b| {
        b.iter(|| black_box(tile_pairs(black_box(&image), black_box(&lr), 64)));
    });

    group.finish();
}

fn srcnn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("srcnn");
    group.sample_size(10);

    let model = Srcnn::from_state_dict(&initial_state_dict(0)).unwrap().eval();
    let patch = Array4::<f32>::from_elem((1, 1, 64, 64), 0.5);

    group.bench_function("forward_64", |b| {
        b.iter(|| black_box(model.forward(black_box(patch.view())).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, preprocessing_benchmark, srcnn_benchmark);
criterion_main!(benches);
