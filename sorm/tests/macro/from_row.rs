use sorm::FromRow;

#[derive(FromRow)]
struct Person {
    id: i64,
    #[sorm(column = "name")]
    display_name: String,
    age: Option<i64>,
}

#[derive(FromRow)]
struct Wrapper<T: sorm::FromValue> {
    value: T,
}

fn assert_from_row<T: sorm::FromRow>() {}

fn main() {
    assert_from_row::<Person>();
    assert_from_row::<Wrapper<f64>>();
}
