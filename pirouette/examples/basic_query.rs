use pirouette::{PirClient, PirContext, PirDatabase, PirParametersBuilder, PirServer};

fn main() -> anyhow::Result<()> {
	// A database of 1000 integers arranged as a 2-dimensional hypercube.
	let params = PirParametersBuilder::new()
		.set_num_items(1000)
		.set_dimensions(2)
		.set_use_ciphertext_multiplication(true)
		.build()?;

	let db_values: Vec<u64> = (0..1000).map(|n| 7 * n + 13).collect();
	let context = PirContext::new(&params)?;
	let database = PirDatabase::from_integers(&context, &db_values)?;
	let server = PirServer::new(database);

	// The client learns db[desired] while the server never sees the index.
	let desired = 421usize;
	let client = PirClient::new(&params)?;
	let request = client.create_request(&[desired])?;
	let response = server.process_request(&request)?;
	let results = client.process_response_integers(&response)?;

	println!("retrieved db[{}] = {}", desired, results[0]);
	assert_eq!(results[0], db_values[desired]);

	Ok(())
}
