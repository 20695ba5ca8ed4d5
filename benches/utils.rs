use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::{Value, json};

/// The profile page rendered by every benchmark, in etlate syntax.
pub const PROFILE_ETLATE: &str = "\
<div class=\"profile\">
  <h1>{% user.name %}</h1>
  {% if user.active %}
  <span class=\"badge\">active, age {% user.age %}</span>
  {% else %}
  <span class=\"badge\">inactive</span>
  {% end %}
  {% if show_details and has_access %}
  <ul>
    {% for item in items %}
    <li>{% item.name %}: {% item.value * 2 %}{% if item.special %} (special){% end %}</li>
    {% end %}
  </ul>
  {% elif show_details %}
  <p>{% len(items) %} items hidden</p>
  {% end %}
</div>
";

/// The same page in jinja syntax.
pub const PROFILE_JINJA: &str = "\
<div class=\"profile\">
  <h1>{{ user.name }}</h1>
  {% if user.active %}
  <span class=\"badge\">active, age {{ user.age }}</span>
  {% else %}
  <span class=\"badge\">inactive</span>
  {% endif %}
  {% if show_details and has_access %}
  <ul>
    {% for item in items %}
    <li>{{ item.name }}: {{ item.value * 2 }}{% if item.special %} (special){% endif %}</li>
    {% endfor %}
  </ul>
  {% elif show_details %}
  <p>{{ items | length }} items hidden</p>
  {% endif %}
</div>
";

/// Builds `n` reproducible profile contexts shared by every benchmark.
pub fn generate_random_contexts(n: usize) -> Vec<Value> {
    let mut rng = StdRng::seed_from_u64(42);
    (0..n).map(|_| random_profile(&mut rng)).collect()
}

fn random_profile(rng: &mut StdRng) -> Value {
    let items: Vec<Value> = (0..rng.random_range(3..10))
        .map(|_| {
            json!({
                "name": random_word(rng, 3, 8),
                "value": rng.random_range(10..1000),
                "special": rng.random_bool(0.3),
            })
        })
        .collect();

    json!({
        "user": {
            "name": random_word(rng, 5, 10),
            "age": rng.random_range(18..80),
            "active": rng.random_bool(0.7),
        },
        "items": items,
        "show_details": rng.random_bool(0.8),
        "has_access": rng.random_bool(0.6),
    })
}

fn random_word(rng: &mut StdRng, min_len: usize, max_len: usize) -> String {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
    let len = rng.random_range(min_len..=max_len);
    (0..len)
        .map(|_| char::from(LETTERS[rng.random_range(0..LETTERS.len())]))
        .collect()
}

// Print binary size information - can be used from individual benchmarks
pub fn print_binary_size() {
    let binary_path = std::env::current_exe().unwrap();
    let metadata = std::fs::metadata(&binary_path).unwrap();
    let size_bytes = metadata.len();
    let size_kb = size_bytes as f64 / 1024.0;
    let size_mb = size_kb / 1024.0;

    println!(
        "Binary size: {:.2} MB ({:.2} KB, {} bytes)",
        size_mb, size_kb, size_bytes
    );
    println!("Binary path: {}", binary_path.display());
}
