use std::sync::Arc;

use arrow::array::{Float64Array, Int32Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Power law with multiplicative lognormal noise: a·x^k·exp(ε).
fn power_law(x: f64, a: f64, k: f64, noise_sd: f64, rng: &mut SimpleRng) -> f64 {
    a * x.powf(k) * rng.gauss(0.0, noise_sd).exp()
}

fn main() {
    let mut rng = SimpleRng::new(42);

    // (entity, code, base population in 1980, annual growth rate)
    let countries: [(&str, &str, f64, f64); 8] = [
        ("Spain", "ESP", 37.4e6, 0.004),
        ("Chile", "CHL", 11.2e6, 0.012),
        ("Kenya", "KEN", 16.3e6, 0.028),
        ("Japan", "JPN", 116.8e6, 0.002),
        ("Norway", "NOR", 4.1e6, 0.006),
        ("Brazil", "BRA", 120.7e6, 0.014),
        ("Vietnam", "VNM", 54.3e6, 0.016),
        ("Morocco", "MAR", 19.6e6, 0.018),
    ];

    let mut all_entity: Vec<String> = Vec::new();
    let mut all_code: Vec<String> = Vec::new();
    let mut all_year: Vec<i32> = Vec::new();
    let mut all_variant: Vec<String> = Vec::new();
    let mut all_population: Vec<Option<f64>> = Vec::new();
    let mut all_gdp: Vec<Option<f64>> = Vec::new();
    let mut all_energy: Vec<Option<f64>> = Vec::new();
    let mut all_urban: Vec<Option<f64>> = Vec::new();

    let mut n_rows = 0usize;
    for &(entity, code, base_pop, growth) in &countries {
        for year in 1980..=2030 {
            // Past years are estimates; 2025 onward comes from the medium
            // projection variant, which the cleaner should drop.
            let variant = if year < 2025 { "estimates" } else { "medium" };
            let population = base_pop * (1.0 + growth).powi(year - 1980);

            // Superlinear GDP (β ≈ 1.15), roughly linear energy, sublinear
            // urban population: the relationships the analysis recovers.
            let gdp = power_law(population, 2.0e-2, 1.15, 0.08, &mut rng);
            let energy = power_law(population, 3.0e-6, 1.05, 0.10, &mut rng);
            let urban = power_law(population, 4.0, 0.85, 0.06, &mut rng);

            // Sprinkle missing cells so the null-threshold filters have
            // something to do.
            let drop_energy = rng.next_f64() < 0.05;
            let drop_urban = rng.next_f64() < 0.03;

            all_entity.push(entity.to_string());
            all_code.push(code.to_string());
            all_year.push(year);
            all_variant.push(variant.to_string());
            all_population.push(Some(population));
            all_gdp.push(Some(gdp));
            all_energy.push(if drop_energy { None } else { Some(energy) });
            all_urban.push(if drop_urban { None } else { Some(urban) });
            n_rows += 1;
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("Entity", DataType::Utf8, false),
        Field::new("Code", DataType::Utf8, false),
        Field::new("Year", DataType::Int32, false),
        Field::new("Variant", DataType::Utf8, false),
        Field::new("population", DataType::Float64, true),
        Field::new("gdp", DataType::Float64, true),
        Field::new("primary_energy", DataType::Float64, true),
        Field::new("urban_pop", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from(all_entity)),
            Arc::new(StringArray::from(all_code)),
            Arc::new(Int32Array::from(all_year)),
            Arc::new(StringArray::from(all_variant)),
            Arc::new(Float64Array::from(all_population)),
            Arc::new(Float64Array::from(all_gdp)),
            Arc::new(Float64Array::from(all_energy)),
            Arc::new(Float64Array::from(all_urban)),
        ],
    )
    .expect("Failed to create RecordBatch");

    let output_path = "sample_panel.parquet";
    let file = std::fs::File::create(output_path).expect("Failed to create output file");
    let mut writer = ArrowWriter::try_new(file, schema, None).expect("Failed to create writer");
    writer.write(&batch).expect("Failed to write batch");
    writer.close().expect("Failed to close writer");

    println!("Wrote {n_rows} country-year rows to {output_path}");
}
