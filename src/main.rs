fn main() -> anyhow::Result<()> {
    moodwatch_lib::run()
}
