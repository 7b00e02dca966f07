fn main() {
    env_logger::init();
    particle_sim::run();
}
