mod configurator;

use crate::configurator::launch::parse_launch_options;
use crate::configurator::viewer;

fn main() {
    let options = parse_launch_options();
    viewer::run(options);
}
