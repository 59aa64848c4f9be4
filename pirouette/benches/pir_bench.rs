use criterion::{criterion_group, criterion_main, Criterion};

use pirouette::{PirClient, PirContext, PirDatabase, PirParametersBuilder, PirServer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn setup(
	num_items: u64,
	dimensions: u32,
	use_ciphertext_multiplication: bool,
) -> (PirServer, PirClient) {
	let params = PirParametersBuilder::new()
		.set_num_items(num_items)
		.set_dimensions(dimensions)
		.set_use_ciphertext_multiplication(use_ciphertext_multiplication)
		.build()
		.expect("failed to build PIR parameters");

	let mut rng = StdRng::seed_from_u64(42);
	let db_values: Vec<u64> = (0..num_items).map(|_| rng.gen_range(0..(1u64 << 40))).collect();

	let context = PirContext::new(&params).expect("failed to create context");
	let database = PirDatabase::from_integers(&context, &db_values).expect("failed to encode db");
	let server = PirServer::new(database);
	let client = PirClient::new(&params).expect("failed to create client");
	(server, client)
}

fn criterion_benchmark(c: &mut Criterion) {
	let (server, client) = setup(1000, 2, true);

	c.bench_function("create_request d2", |b| {
		b.iter(|| client.create_request(&[421]).expect("request failed"))
	});

	let request = client.create_request(&[421]).expect("request failed");
	c.bench_function("process_request 1000x d2", |b| {
		b.iter(|| server.process_request(&request).expect("server failed"))
	});

	let response = server.process_request(&request).expect("server failed");
	c.bench_function("process_response d2", |b| {
		b.iter(|| {
			client
				.process_response_integers(&response)
				.expect("decode failed")
		})
	});
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
