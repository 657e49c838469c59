fn main() {
    env_logger::init();
    ember::run();
}
