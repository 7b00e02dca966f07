fn main() {
    env_logger::init();
    geodesic_sim::run();
}
